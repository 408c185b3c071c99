use chrono::NaiveDate;

/// Ordered (date, log-return) observations for one instrument over a window.
/// Immutable once captured; rebuilt from scratch on every recalibration.
#[derive(Debug, Clone)]
pub struct ReturnSample {
    pub symbol: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl ReturnSample {
    pub fn new(symbol: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, r)| *r).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
