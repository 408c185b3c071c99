use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use copula_pairs::engine::{
    entry_transition, EngineSettings, ExecutionSink, ReturnSeriesProvider, SignalEngine,
};
use copula_pairs::model::{MispricingIndices, ReturnSample, SignalState, TradeInstruction};

/// Clones share state, so a test can keep a handle to the provider the
/// engine owns and flip failures or swap series mid-test.
#[derive(Clone)]
struct MockProvider {
    inner: Rc<ProviderState>,
}

struct ProviderState {
    series: RefCell<HashMap<String, Vec<f64>>>,
    closes: RefCell<HashMap<String, f64>>,
    fail: Cell<bool>,
    warmup_available: Cell<bool>,
}

impl MockProvider {
    fn new(series: &[(&str, Vec<f64>)], closes: &[(&str, f64)]) -> Self {
        Self {
            inner: Rc::new(ProviderState {
                series: RefCell::new(
                    series
                        .iter()
                        .map(|(s, v)| (s.to_string(), v.clone()))
                        .collect(),
                ),
                closes: RefCell::new(
                    closes.iter().map(|(s, c)| (s.to_string(), *c)).collect(),
                ),
                fail: Cell::new(false),
                warmup_available: Cell::new(true),
            }),
        }
    }

    fn without_warmup(self) -> Self {
        self.inner.warmup_available.set(false);
        self
    }

    fn set_series(&self, symbol: &str, values: Vec<f64>) {
        self.inner
            .series
            .borrow_mut()
            .insert(symbol.to_string(), values);
    }

    fn set_failing(&self, fail: bool) {
        self.inner.fail.set(fail);
    }
}

impl ReturnSeriesProvider for MockProvider {
    fn log_returns(
        &self,
        symbols: &[String],
        _lookback: usize,
        _as_of: NaiveDate,
    ) -> Result<HashMap<String, ReturnSample>> {
        if self.inner.fail.get() {
            bail!("simulated provider outage");
        }
        let store = self.inner.series.borrow();
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut out = HashMap::new();
        for symbol in symbols {
            let values = store
                .get(symbol)
                .ok_or_else(|| anyhow!("no series for {symbol}"))?;
            let points = values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + chrono::Duration::days(i as i64), *v))
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
        if !self.inner.warmup_available.get() {
            return Ok(Vec::new());
        }
        let closes = self.inner.closes.borrow();
        let close = closes
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow!("no close for {symbol}"))?;
        Ok((0..count).map(|_| (as_of, close)).collect())
    }
}

#[derive(Clone, Default)]
struct RecordingSink {
    instructions: Rc<RefCell<Vec<TradeInstruction>>>,
}

impl RecordingSink {
    fn recorded(&self) -> Vec<TradeInstruction> {
        self.instructions.borrow().clone()
    }
}

impl ExecutionSink for RecordingSink {
    fn set_target_weight(&mut self, symbol: &str, weight: f64) {
        self.instructions
            .borrow_mut()
            .push(TradeInstruction::SetTargetWeight {
                symbol: symbol.to_string(),
                weight,
            });
    }

    fn liquidate(&mut self, symbol: &str) {
        self.instructions
            .borrow_mut()
            .push(TradeInstruction::Liquidate {
                symbol: symbol.to_string(),
            });
    }
}

/// Strongly co-moving return series with tau well below 1 so the copula
/// fit stays non-degenerate.
fn comoving_series(n: usize) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.71).sin() * 0.02).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, v)| v + 0.006 * (i as f64 * 1.31).cos())
        .collect();
    (x, y)
}

fn weak_series(n: usize) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.9).sin() * 0.01).collect();
    let y: Vec<f64> = (0..n).map(|i| (i as f64 * 2.3).cos() * 0.01).collect();
    (x, y)
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn feb(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
}

fn bars(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(s, c)| (s.to_string(), *c)).collect()
}

fn single_pair_engine(
    provider: MockProvider,
) -> (SignalEngine<MockProvider, RecordingSink>, RecordingSink) {
    let sink = RecordingSink::default();
    let engine = SignalEngine::new(
        EngineSettings::default(),
        vec![("AAA".to_string(), "BBB".to_string())],
        provider,
        sink.clone(),
    );
    (engine, sink)
}

fn comoving_provider() -> MockProvider {
    let (x, y) = comoving_series(400);
    MockProvider::new(
        &[("AAA", x), ("BBB", y)],
        &[("AAA", 100.0), ("BBB", 50.0)],
    )
}

#[test]
fn entry_rule_literal_scenarios() {
    let enter_a = MispricingIndices {
        mi_u_given_v: 0.02,
        mi_v_given_u: 0.97,
    };
    assert_eq!(
        entry_transition(&enter_a, 0.05, 0.95),
        Some(SignalState::LongAShortB)
    );

    let neutral = MispricingIndices {
        mi_u_given_v: 0.5,
        mi_v_given_u: 0.5,
    };
    assert_eq!(entry_transition(&neutral, 0.05, 0.95), None);

    let enter_b = MispricingIndices {
        mi_u_given_v: 0.97,
        mi_v_given_u: 0.02,
    };
    assert_eq!(
        entry_transition(&enter_b, 0.05, 0.95),
        Some(SignalState::LongBShortA)
    );
}

#[test]
fn daily_bar_without_model_stays_flat() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::Flat);
    assert!(sink.recorded().is_empty());
}

#[test]
fn recalibration_fits_pair_and_copula() {
    let (mut engine, _sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();

    let pair = engine.active_pair().unwrap();
    assert_eq!(pair.leg_a, "AAA");
    assert_eq!(pair.leg_b, "BBB");
    // BBB is AAA plus bounded noise, so the hedge ratio sits near 1.
    assert!((pair.hedge_ratio - 1.0).abs() < 0.3);

    let copula = engine.fitted_copula().unwrap();
    assert!(copula.theta > 1.0, "theta = {}", copula.theta);
}

#[test]
fn underpriced_leg_a_enters_long_a_short_b() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();

    // Leg A crashes while leg B rallies: u pins to the bottom of the
    // formation ECDF, v to the top.
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();

    assert_eq!(engine.state(), SignalState::LongAShortB);
    let indices = engine.last_indices().unwrap();
    assert!(
        indices.mi_u_given_v < 0.05,
        "mi_u_given_v = {}",
        indices.mi_u_given_v
    );
    assert!(
        indices.mi_v_given_u > 0.95,
        "mi_v_given_u = {}",
        indices.mi_v_given_u
    );

    let hedge_ratio = engine.active_pair().unwrap().hedge_ratio;
    let expected_weight_a = 0.5 * hedge_ratio * 90.0 / 55.0;
    let recorded = sink.recorded();
    assert_eq!(
        recorded,
        vec![
            TradeInstruction::SetTargetWeight {
                symbol: "BBB".to_string(),
                weight: -0.5,
            },
            TradeInstruction::SetTargetWeight {
                symbol: "AAA".to_string(),
                weight: expected_weight_a,
            },
        ]
    );
}

#[test]
fn underpriced_leg_b_enters_long_b_short_a() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();

    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 110.0), ("BBB", 45.0)]))
        .unwrap();

    assert_eq!(engine.state(), SignalState::LongBShortA);
    let recorded = sink.recorded();
    assert!(matches!(
        recorded[0],
        TradeInstruction::SetTargetWeight { ref symbol, weight } if symbol == "BBB" && weight > 0.0
    ));
    assert!(matches!(
        recorded[1],
        TradeInstruction::SetTargetWeight { ref symbol, weight } if symbol == "AAA" && weight < 0.0
    ));
}

#[test]
fn neutral_day_stays_flat() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();

    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 100.05), ("BBB", 50.01)]))
        .unwrap();

    assert_eq!(engine.state(), SignalState::Flat);
    assert!(sink.recorded().is_empty());
}

#[test]
fn open_position_ignores_further_signals() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    let after_entry = sink.recorded().len();

    // Another extreme day, opposite direction: no exit, no flip.
    engine
        .on_daily_bar(jan(4), &bars(&[("AAA", 99.0), ("BBB", 50.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::LongAShortB);
    assert_eq!(sink.recorded().len(), after_entry);
}

#[test]
fn repeated_bar_for_same_date_is_ignored() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    let after_entry = sink.recorded().len();

    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(sink.recorded().len(), after_entry);
}

#[test]
fn bar_missing_a_leg_is_skipped() {
    let (mut engine, sink) = single_pair_engine(comoving_provider());
    engine.on_month_boundary(jan(2)).unwrap();

    engine.on_daily_bar(jan(3), &bars(&[("AAA", 90.0)])).unwrap();
    assert_eq!(engine.state(), SignalState::Flat);
    assert!(sink.recorded().is_empty());

    // The skipped date was not consumed; the full bar still trades.
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::LongAShortB);
}

#[test]
fn without_warmup_first_bar_only_fills_the_window() {
    let (mut engine, sink) = single_pair_engine(comoving_provider().without_warmup());
    engine.on_month_boundary(jan(2)).unwrap();

    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 100.0), ("BBB", 50.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::Flat);
    assert!(sink.recorded().is_empty());

    engine
        .on_daily_bar(jan(4), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::LongAShortB);
}

#[test]
fn failed_recalibration_keeps_last_model() {
    let provider = comoving_provider();
    let provider_handle = provider.clone();
    let (mut engine, _sink) = single_pair_engine(provider);

    engine.on_month_boundary(jan(2)).unwrap();
    let pair_before = engine.active_pair().unwrap().clone();
    let copula_before = engine.fitted_copula().unwrap().clone();

    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::LongAShortB);

    // February's refit fails outright; model, pair and position survive.
    provider_handle.set_failing(true);
    assert!(engine.on_month_boundary(feb(1)).is_err());
    assert_eq!(engine.active_pair().unwrap(), &pair_before);
    assert_eq!(engine.fitted_copula().unwrap(), &copula_before);
    assert_eq!(engine.state(), SignalState::LongAShortB);
}

#[test]
fn pair_rotation_liquidates_and_resets() {
    let (strong_x, strong_y) = comoving_series(400);
    let (weak_x, weak_y) = weak_series(400);
    let provider = MockProvider::new(
        &[
            ("AAA", strong_x.clone()),
            ("BBB", strong_y.clone()),
            ("CCC", weak_x),
            ("DDD", weak_y),
        ],
        &[("AAA", 100.0), ("BBB", 50.0), ("CCC", 20.0), ("DDD", 40.0)],
    );
    let provider_handle = provider.clone();
    let sink = RecordingSink::default();
    let mut engine = SignalEngine::new(
        EngineSettings::default(),
        vec![
            ("AAA".to_string(), "BBB".to_string()),
            ("CCC".to_string(), "DDD".to_string()),
        ],
        provider,
        sink.clone(),
    );

    engine.on_month_boundary(jan(2)).unwrap();
    assert_eq!(engine.active_pair().unwrap().leg_a, "AAA");
    engine
        .on_daily_bar(jan(3), &bars(&[("AAA", 90.0), ("BBB", 55.0)]))
        .unwrap();
    assert_eq!(engine.state(), SignalState::LongAShortB);

    // In February CCC/DDD becomes the tighter pair; rotation liquidates
    // both old legs and resets the stance.
    provider_handle.set_series("CCC", strong_x);
    provider_handle.set_series("DDD", strong_y);
    provider_handle.set_series("AAA", weak_series(400).0);
    provider_handle.set_series("BBB", weak_series(400).1);
    engine.on_month_boundary(feb(1)).unwrap();

    assert_eq!(engine.active_pair().unwrap().leg_a, "CCC");
    assert_eq!(engine.state(), SignalState::Flat);
    let recorded = sink.recorded();
    let tail = &recorded[recorded.len() - 2..];
    assert_eq!(
        tail,
        &[
            TradeInstruction::Liquidate {
                symbol: "AAA".to_string(),
            },
            TradeInstruction::Liquidate {
                symbol: "BBB".to_string(),
            },
        ]
    );
}
