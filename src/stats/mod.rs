pub mod ecdf;
pub mod kendall;
pub mod ols;

pub use ecdf::EmpiricalDistribution;
pub use kendall::kendall_tau;
pub use ols::regression_slope;
