pub mod replay;

pub use replay::{run, schedule, MarketEvent};
