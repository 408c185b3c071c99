use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::engine::ReturnSeriesProvider;
use crate::error::SignalError;
use crate::model::ReturnSample;

#[derive(Debug, Deserialize)]
struct CloseRow {
    date: NaiveDate,
    close: f64,
}

/// Historical daily closes loaded from per-symbol CSV files
/// (`<data_dir>/<SYMBOL>.csv`, header `date,close`). Serves aligned
/// log-return series on the intersection of the requested symbols' trading
/// dates, and exposes the full date index for the replay runtime.
#[derive(Debug, Clone, Default)]
pub struct CsvBarProvider {
    closes: HashMap<String, BTreeMap<NaiveDate, f64>>,
    dates: Vec<NaiveDate>,
}

impl CsvBarProvider {
    pub fn load(data_dir: &Path, symbols: &[String]) -> Result<Self, SignalError> {
        let mut closes: HashMap<String, BTreeMap<NaiveDate, f64>> = HashMap::new();
        let mut all_dates: BTreeSet<NaiveDate> = BTreeSet::new();

        for symbol in symbols {
            let path = data_dir.join(format!("{symbol}.csv"));
            let mut reader = csv::Reader::from_path(&path).map_err(|e| {
                SignalError::Config(format!("cannot open {}: {e}", path.display()))
            })?;
            let mut series = BTreeMap::new();
            for row in reader.deserialize::<CloseRow>() {
                let row = row?;
                if row.close > 0.0 {
                    all_dates.insert(row.date);
                    series.insert(row.date, row.close);
                }
            }
            if series.is_empty() {
                return Err(SignalError::Config(format!(
                    "no usable rows in {}",
                    path.display()
                )));
            }
            tracing::debug!(symbol = %symbol, rows = series.len(), "Loaded close history");
            closes.insert(symbol.clone(), series);
        }

        Ok(Self {
            closes,
            dates: all_dates.into_iter().collect(),
        })
    }

    /// Sorted union of all loaded trading dates.
    pub fn trading_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Closes of every loaded symbol that traded on `date`.
    pub fn closes_on(&self, date: NaiveDate) -> HashMap<String, f64> {
        self.closes
            .iter()
            .filter_map(|(symbol, series)| {
                series.get(&date).map(|close| (symbol.clone(), *close))
            })
            .collect()
    }

    /// Trading dates before `as_of` on which every requested symbol has a
    /// close. This is the shared index the return series are aligned on.
    fn common_dates(&self, symbols: &[String], as_of: NaiveDate) -> Result<Vec<NaiveDate>> {
        for symbol in symbols {
            if !self.closes.contains_key(symbol) {
                return Err(SignalError::Config(format!("no history loaded for {symbol}")).into());
            }
        }
        Ok(self
            .dates
            .iter()
            .filter(|date| **date < as_of)
            .filter(|date| {
                symbols
                    .iter()
                    .all(|s| self.closes[s].contains_key(*date))
            })
            .copied()
            .collect())
    }
}

impl ReturnSeriesProvider for CsvBarProvider {
    fn log_returns(
        &self,
        symbols: &[String],
        lookback: usize,
        as_of: NaiveDate,
    ) -> Result<HashMap<String, ReturnSample>> {
        let common = self.common_dates(symbols, as_of)?;
        // lookback returns need lookback + 1 closes
        if common.len() < lookback + 1 {
            return Err(SignalError::InsufficientData {
                required: lookback + 1,
                got: common.len(),
            }
            .into());
        }
        let tail = &common[common.len() - (lookback + 1)..];

        let mut out = HashMap::new();
        for symbol in symbols {
            let series = &self.closes[symbol];
            let points: Vec<(NaiveDate, f64)> = tail
                .windows(2)
                .map(|pair| {
                    let prev = series[&pair[0]];
                    let curr = series[&pair[1]];
                    (pair[1], (curr / prev).ln())
                })
                .collect();
            out.insert(symbol.clone(), ReturnSample::new(symbol.clone(), points));
        }
        Ok(out)
    }

    fn recent_closes(
        &self,
        symbol: &str,
        count: usize,
        as_of: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>> {
        let series = self
            .closes
            .get(symbol)
            .ok_or_else(|| SignalError::Config(format!("no history loaded for {symbol}")))?;
        let mut recent: Vec<(NaiveDate, f64)> = series
            .range(..as_of)
            .rev()
            .take(count)
            .map(|(date, close)| (*date, *close))
            .collect();
        recent.reverse();
        Ok(recent)
    }
}
