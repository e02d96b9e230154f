//! Trade signal model and free-form signal text parsing.

mod parser;
mod types;

pub use parser::{parse_signal, ParseError};
pub use types::{Entry, OrderType, TradeSignal, SUPPORTED_SYMBOLS};
