use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate};

use crate::engine::ReturnSeriesProvider;
use crate::error::SignalError;
use crate::model::TradingPair;
use crate::stats::{kendall_tau, regression_slope};

/// Monthly scan over a fixed candidate universe: every pair's legs are
/// pulled over the lookback window, scored by Kendall's tau, and the pair
/// with the strictly greatest tau wins (the first candidate keeps ties).
/// The winner's hedge ratio is the OLS slope of leg-B returns on leg-A
/// returns over the same window.
pub struct PairSelector {
    candidates: Vec<(String, String)>,
    lookback: usize,
    last_refresh: Option<(i32, u32)>,
    active: Option<TradingPair>,
}

impl PairSelector {
    pub fn new(candidates: Vec<(String, String)>, lookback: usize) -> Self {
        Self {
            candidates,
            lookback,
            last_refresh: None,
            active: None,
        }
    }

    pub fn active_pair(&self) -> Option<&TradingPair> {
        self.active.as_ref()
    }

    /// Idempotent within a calendar month: a repeat call with the same
    /// (year, month) returns the cached pair without touching the provider.
    pub fn select_pair<P: ReturnSeriesProvider>(
        &mut self,
        provider: &P,
        today: NaiveDate,
    ) -> Result<TradingPair> {
        let month_key = (today.year(), today.month());
        if self.last_refresh == Some(month_key) {
            if let Some(pair) = &self.active {
                tracing::debug!(pair = %pair, "Pair selection already ran this month");
                return Ok(pair.clone());
            }
        }
        if self.candidates.is_empty() {
            return Err(SignalError::Config("no candidate pairs configured".to_string()).into());
        }

        let mut best_tau = f64::NEG_INFINITY;
        let mut best: Option<(String, String, Vec<f64>, Vec<f64>)> = None;

        for (leg_a, leg_b) in &self.candidates {
            let series = provider
                .log_returns(&[leg_a.clone(), leg_b.clone()], self.lookback, today)
                .with_context(|| format!("fetching history for candidate {leg_a}/{leg_b}"))?;
            let x = series
                .get(leg_a)
                .ok_or_else(|| anyhow!("provider returned no series for {leg_a}"))?
                .values();
            let y = series
                .get(leg_b)
                .ok_or_else(|| anyhow!("provider returned no series for {leg_b}"))?
                .values();

            let tau = kendall_tau(&x, &y)
                .with_context(|| format!("rank correlation for candidate {leg_a}/{leg_b}"))?;
            tracing::debug!(leg_a = %leg_a, leg_b = %leg_b, tau, "Scored candidate pair");

            if tau > best_tau {
                best_tau = tau;
                best = Some((leg_a.clone(), leg_b.clone(), x, y));
            }
        }

        let (leg_a, leg_b, x, y) =
            best.ok_or_else(|| anyhow!("no candidate pair could be scored"))?;
        let hedge_ratio = regression_slope(&x, &y)
            .with_context(|| format!("hedge ratio regression for {leg_a}/{leg_b}"))?;

        let pair = TradingPair {
            leg_a,
            leg_b,
            hedge_ratio,
        };
        tracing::info!(
            pair = %pair,
            tau = best_tau,
            hedge_ratio = pair.hedge_ratio,
            "Selected trading pair"
        );
        self.last_refresh = Some(month_key);
        self.active = Some(pair.clone());
        Ok(pair)
    }
}
