use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDate;

use crate::model::ReturnSample;

pub mod pair_selector;
pub mod signal_engine;

pub use pair_selector::PairSelector;
pub use signal_engine::{entry_transition, EngineSettings, SignalEngine};

/// Pull interface for historical daily log-returns. Implementations must
/// return aligned, equal-length series for all requested symbols over the
/// same trading-date index, most recent observation last, using only data
/// dated strictly before `as_of`.
pub trait ReturnSeriesProvider {
    fn log_returns(
        &self,
        symbols: &[String],
        lookback: usize,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, ReturnSample>>;

    /// The last `count` daily closes for one symbol before `as_of`, oldest
    /// first. Used to warm the engine's price window at pair adoption.
    fn recent_closes(
        &self,
        symbol: &str,
        count: usize,
        as_of: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>>;
}

/// Fire-and-forget order interface. The engine emits target portfolio
/// weights and liquidations and never reads anything back.
pub trait ExecutionSink {
    fn set_target_weight(&mut self, symbol: &str, weight: f64);
    fn liquidate(&mut self, symbol: &str);
}
