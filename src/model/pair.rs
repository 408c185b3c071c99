/// The active trading pair: two instrument legs plus the OLS hedge ratio
/// (slope of leg-B log-returns regressed on leg-A log-returns).
///
/// Created at monthly pair selection and replaced wholesale; the previous
/// pair's positions are liquidated before a different pair is adopted.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingPair {
    pub leg_a: String,
    pub leg_b: String,
    pub hedge_ratio: f64,
}

impl TradingPair {
    /// True when both legs name the same instruments. The hedge ratio is
    /// refreshed monthly even when the instruments are unchanged, so pair
    /// rotation is decided on legs alone.
    pub fn same_legs(&self, other: &TradingPair) -> bool {
        self.leg_a == other.leg_a && self.leg_b == other.leg_b
    }
}

impl std::fmt::Display for TradingPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.leg_a, self.leg_b)
    }
}
