use std::path::Path;

use anyhow::Result;
use tokio::sync::watch;

use copula_pairs::config::Config;
use copula_pairs::engine::SignalEngine;
use copula_pairs::feed::CsvBarProvider;
use copula_pairs::journal::{JournalingSink, TradeJournal};
use copula_pairs::runtime::replay;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .init();

    tracing::info!(
        data_dir = %config.feed.data_dir,
        candidates = config.universe.candidates.len(),
        formation_window = config.engine.formation_window,
        lookback_window = config.engine.lookback_window,
        "Starting copula-pairs"
    );

    let symbols = config.universe.symbols();
    let feed = CsvBarProvider::load(Path::new(&config.feed.data_dir), &symbols)?;
    let journal = TradeJournal::open(Path::new(&config.feed.journal_path))?;
    let sink = JournalingSink::new(journal);

    let engine = SignalEngine::new(
        config.engine.settings(),
        config.universe.candidate_pairs(),
        feed.clone(),
        sink,
    );

    let events = replay::schedule(&feed);
    tracing::info!(
        events = events.len(),
        trading_days = feed.trading_dates().len(),
        "Replaying trading calendar"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let engine = replay::run(engine, events, shutdown_rx).await;
    tracing::info!(
        state = %engine.state(),
        pair = engine.active_pair().map(|p| p.to_string()).unwrap_or_else(|| "none".to_string()),
        "Replay complete"
    );
    Ok(())
}
