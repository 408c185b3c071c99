use std::collections::{HashMap, VecDeque};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::copula::{select_best_family, CopulaModel};
use crate::engine::{ExecutionSink, PairSelector, ReturnSeriesProvider};
use crate::model::{MispricingIndices, SignalState, TradingPair};
use crate::stats::EmpiricalDistribution;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub floor_cl: f64,
    pub cap_cl: f64,
    pub formation_window: usize,
    pub lookback_window: usize,
    pub leg_weight: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            floor_cl: 0.05,
            cap_cl: 0.95,
            formation_window: 1000,
            lookback_window: 250,
            leg_weight: 0.5,
        }
    }
}

/// Everything produced by one monthly recalibration. Built off to the side
/// and swapped in whole, so a failed refit can never leave the engine with
/// a half-replaced model.
#[derive(Debug, Clone)]
struct FittedModel {
    pair: TradingPair,
    copula: CopulaModel,
    ecdf_a: EmpiricalDistribution,
    ecdf_b: EmpiricalDistribution,
}

/// The core orchestrator: monthly recalibration (pair scan, copula fit,
/// marginal ECDFs) and the daily mispricing-index state machine.
pub struct SignalEngine<P: ReturnSeriesProvider, S: ExecutionSink> {
    settings: EngineSettings,
    provider: P,
    sink: S,
    pair_selector: PairSelector,
    model: Option<FittedModel>,
    state: SignalState,
    windows: HashMap<String, VecDeque<f64>>,
    last_indices: Option<MispricingIndices>,
    last_bar_date: Option<NaiveDate>,
}

impl<P: ReturnSeriesProvider, S: ExecutionSink> SignalEngine<P, S> {
    pub fn new(
        settings: EngineSettings,
        candidates: Vec<(String, String)>,
        provider: P,
        sink: S,
    ) -> Self {
        let pair_selector = PairSelector::new(candidates, settings.lookback_window);
        Self {
            settings,
            provider,
            sink,
            pair_selector,
            model: None,
            state: SignalState::Flat,
            windows: HashMap::new(),
            last_indices: None,
            last_bar_date: None,
        }
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    pub fn last_indices(&self) -> Option<MispricingIndices> {
        self.last_indices
    }

    pub fn active_pair(&self) -> Option<&TradingPair> {
        self.model.as_ref().map(|m| &m.pair)
    }

    pub fn fitted_copula(&self) -> Option<&CopulaModel> {
        self.model.as_ref().map(|m| &m.copula)
    }

    /// Monthly recalibration: pair scan, formation-window copula fit and
    /// marginal ECDFs, then atomic adoption. Any error propagates to the
    /// caller before engine state is touched, so the last good model (and
    /// any open position) survives a failed refit.
    pub fn on_month_boundary(&mut self, today: NaiveDate) -> Result<()> {
        let pair = self
            .pair_selector
            .select_pair(&self.provider, today)
            .context("monthly pair selection failed")?;
        let pair_changed = self
            .model
            .as_ref()
            .map_or(true, |m| !m.pair.same_legs(&pair));

        let series = self
            .provider
            .log_returns(
                &[pair.leg_a.clone(), pair.leg_b.clone()],
                self.settings.formation_window,
                today,
            )
            .context("fetching formation-window history")?;
        let x = series
            .get(&pair.leg_a)
            .ok_or_else(|| anyhow!("provider returned no series for {}", pair.leg_a))?
            .values();
        let y = series
            .get(&pair.leg_b)
            .ok_or_else(|| anyhow!("provider returned no series for {}", pair.leg_b))?
            .values();

        let copula = select_best_family(&x, &y)
            .with_context(|| format!("copula selection for {pair}"))?;
        let ecdf_a = EmpiricalDistribution::fit(&x)?;
        let ecdf_b = EmpiricalDistribution::fit(&y)?;

        // Warm the two-deep close windows with the close preceding today's
        // bar, so the first bar after a rotation can already trade.
        let mut warmed: HashMap<String, VecDeque<f64>> = HashMap::new();
        if pair_changed {
            for leg in [&pair.leg_a, &pair.leg_b] {
                let closes = self
                    .provider
                    .recent_closes(leg, 1, today)
                    .with_context(|| format!("warming price window for {leg}"))?;
                let mut window = VecDeque::with_capacity(2);
                for (_, close) in closes {
                    push_close(&mut window, close);
                }
                warmed.insert(leg.clone(), window);
            }
        }

        // Commit point: nothing below can fail.
        if pair_changed {
            if let Some(old) = self.model.as_ref().map(|m| m.pair.clone()) {
                tracing::info!(old_pair = %old, new_pair = %pair, "Pair rotated; liquidating previous legs");
                self.sink.liquidate(&old.leg_a);
                self.sink.liquidate(&old.leg_b);
            }
            self.state = SignalState::Flat;
            self.windows = warmed;
        }
        tracing::info!(
            pair = %pair,
            family = %copula.family,
            theta = copula.theta,
            "Recalibrated copula model"
        );
        self.model = Some(FittedModel {
            pair,
            copula,
            ecdf_a,
            ecdf_b,
        });
        Ok(())
    }

    /// Daily update: roll the price windows, map today's one-day log-returns
    /// through the formation ECDFs, evaluate both mispricing indices and
    /// apply the entry rule. A repeated bar for the same date is a no-op; a
    /// bar missing one leg's close is skipped with a warning.
    pub fn on_daily_bar(&mut self, date: NaiveDate, closes: &HashMap<String, f64>) -> Result<()> {
        let Some(model) = &self.model else {
            tracing::debug!(%date, "No fitted model yet; staying flat");
            return Ok(());
        };
        if self.last_bar_date == Some(date) {
            return Ok(());
        }
        let pair = model.pair.clone();

        let (Some(&close_a), Some(&close_b)) =
            (closes.get(&pair.leg_a), closes.get(&pair.leg_b))
        else {
            tracing::warn!(%date, pair = %pair, "Daily bar missing a leg close; skipping day");
            return Ok(());
        };
        push_close(self.windows.entry(pair.leg_a.clone()).or_default(), close_a);
        push_close(self.windows.entry(pair.leg_b.clone()).or_default(), close_b);
        self.last_bar_date = Some(date);

        let window_a = &self.windows[&pair.leg_a];
        let window_b = &self.windows[&pair.leg_b];
        if window_a.len() < 2 || window_b.len() < 2 {
            tracing::debug!(%date, pair = %pair, "Price window still warming up");
            return Ok(());
        }
        let return_a = (window_a[1] / window_a[0]).ln();
        let return_b = (window_b[1] / window_b[0]).ln();

        let u = model.ecdf_a.evaluate(return_a);
        let v = model.ecdf_b.evaluate(return_b);
        let indices = model.copula.mispricing_indices(u, v);
        self.last_indices = Some(indices);
        tracing::debug!(
            %date,
            mi_u_given_v = indices.mi_u_given_v,
            mi_v_given_u = indices.mi_v_given_u,
            state = %self.state,
            "Computed mispricing indices"
        );

        if self.state != SignalState::Flat {
            return Ok(());
        }
        let Some(entered) =
            entry_transition(&indices, self.settings.floor_cl, self.settings.cap_cl)
        else {
            return Ok(());
        };

        // Leg B carries the fixed target weight; leg A offsets it scaled by
        // the hedge ratio and the price ratio of the two legs.
        let weight_b = self.settings.leg_weight;
        let weight_a = self.settings.leg_weight * pair.hedge_ratio * close_a / close_b;
        let decision_id = format!("dec-{}", &uuid::Uuid::new_v4().to_string()[..8]);
        match entered {
            SignalState::LongAShortB => {
                self.sink.set_target_weight(&pair.leg_b, -weight_b);
                self.sink.set_target_weight(&pair.leg_a, weight_a);
            }
            SignalState::LongBShortA => {
                self.sink.set_target_weight(&pair.leg_b, weight_b);
                self.sink.set_target_weight(&pair.leg_a, -weight_a);
            }
            SignalState::Flat => unreachable!("entry_transition never returns Flat"),
        }
        self.state = entered;
        tracing::info!(
            decision_id = %decision_id,
            %date,
            pair = %pair,
            state = %self.state,
            mi_u_given_v = indices.mi_u_given_v,
            mi_v_given_u = indices.mi_v_given_u,
            "Entered pair position"
        );
        Ok(())
    }
}

/// The entry rule, evaluated only from `Flat`: leg A is judged underpriced
/// when its conditional probability is below the floor while leg B's is
/// above the cap, and vice versa. Index reversion never closes a position.
pub fn entry_transition(
    indices: &MispricingIndices,
    floor_cl: f64,
    cap_cl: f64,
) -> Option<SignalState> {
    if indices.mi_u_given_v < floor_cl && indices.mi_v_given_u > cap_cl {
        Some(SignalState::LongAShortB)
    } else if indices.mi_u_given_v > cap_cl && indices.mi_v_given_u < floor_cl {
        Some(SignalState::LongBShortA)
    } else {
        None
    }
}

fn push_close(window: &mut VecDeque<f64>, close: f64) {
    window.push_back(close);
    while window.len() > 2 {
        let _ = window.pop_front();
    }
}
