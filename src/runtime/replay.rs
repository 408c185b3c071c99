use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tokio::sync::{mpsc, watch};

use crate::engine::{ExecutionSink, ReturnSeriesProvider, SignalEngine};
use crate::feed::CsvBarProvider;

/// The two external triggers the engine is driven by, delivered strictly
/// sequentially: a month boundary fires before the first bar of a new
/// calendar month, then the daily bars of that month follow.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    MonthBoundary(NaiveDate),
    DailyBar {
        date: NaiveDate,
        closes: HashMap<String, f64>,
    },
}

/// Turn the feed's trading-date index into the event stream of one replay.
pub fn schedule(feed: &CsvBarProvider) -> Vec<MarketEvent> {
    let mut events = Vec::new();
    let mut current_month: Option<(i32, u32)> = None;
    for date in feed.trading_dates() {
        let month_key = (date.year(), date.month());
        if current_month != Some(month_key) {
            events.push(MarketEvent::MonthBoundary(*date));
            current_month = Some(month_key);
        }
        events.push(MarketEvent::DailyBar {
            date: *date,
            closes: feed.closes_on(*date),
        });
    }
    events
}

/// Feed the event stream through the engine: a producer task pushes events
/// into a channel, the consumer loop below dispatches them one at a time.
/// Recalibration and daily-update failures are reported and the loop keeps
/// going on the last good model; the watch channel requests shutdown.
pub async fn run<P, S>(
    mut engine: SignalEngine<P, S>,
    events: Vec<MarketEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> SignalEngine<P, S>
where
    P: ReturnSeriesProvider + Send + 'static,
    S: ExecutionSink + Send + 'static,
{
    let (event_tx, mut event_rx) = mpsc::channel::<MarketEvent>(256);
    let producer = tokio::spawn(async move {
        for event in events {
            if event_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let mut shutdown_closed = false;
    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    break;
                };
                match event {
                    MarketEvent::MonthBoundary(date) => {
                        if let Err(e) = engine.on_month_boundary(date) {
                            tracing::error!(%date, error = %format!("{e:#}"), "Monthly recalibration failed; keeping last model");
                        }
                    }
                    MarketEvent::DailyBar { date, closes } => {
                        if let Err(e) = engine.on_daily_bar(date, &closes) {
                            tracing::error!(%date, error = %format!("{e:#}"), "Daily update failed");
                        }
                    }
                }
            }
            changed = shutdown_rx.changed(), if !shutdown_closed => {
                match changed {
                    Ok(()) if *shutdown_rx.borrow() => {
                        tracing::info!("Shutdown requested; stopping replay");
                        break;
                    }
                    Ok(()) => {}
                    Err(_) => shutdown_closed = true,
                }
            }
        }
    }

    producer.abort();
    engine
}
