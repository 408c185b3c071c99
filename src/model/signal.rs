use std::fmt;

use serde::Serialize;

/// Position stance of the engine for the active pair. Entered from `Flat`
/// when the mispricing indices cross the configured thresholds; left only
/// when the pair is rotated out (liquidation) -- never on index reversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Flat,
    LongAShortB,
    LongBShortA,
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Flat => write!(f, "FLAT"),
            SignalState::LongAShortB => write!(f, "LONG_A_SHORT_B"),
            SignalState::LongBShortA => write!(f, "LONG_B_SHORT_A"),
        }
    }
}

/// The two copula-implied conditional probabilities computed every trading
/// day: P(U <= u | V = v) and P(V <= v | U = u), both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MispricingIndices {
    pub mi_u_given_v: f64,
    pub mi_v_given_u: f64,
}

/// A single fire-and-forget instruction handed to the execution sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TradeInstruction {
    SetTargetWeight { symbol: String, weight: f64 },
    Liquidate { symbol: String },
}
