//! Risk math: pip-size resolution and position sizing.

mod engine;
mod pips;

pub use engine::{compute, RiskError, RiskSummary, PIP_VALUE_PER_LOT};
pub use pips::{pip_distance, pip_size};
