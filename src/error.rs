use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("insufficient data: need at least {required} observations, got {got}")]
    InsufficientData { required: usize, got: usize },

    #[error("length mismatch: series of {left} and {right} observations")]
    LengthMismatch { left: usize, right: usize },

    #[error("degenerate parameter: {0}")]
    DegenerateParameter(String),

    #[error("optimization diverged: {0}")]
    OptimizationDiverged(String),

    #[error("no copula fitted: all candidate families failed")]
    NoCopulaFitted,

    #[error("config error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
