//! Core trade signal types shared by the parser, risk engine, and lifecycle.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Instruments the bot is willing to trade: major/cross currency pairs
/// plus gold and silver.
pub const SUPPORTED_SYMBOLS: &[&str] = &[
    "AUDCAD", "AUDCHF", "AUDJPY", "AUDNZD", "AUDUSD", "CADCHF", "CADJPY",
    "CHFJPY", "EURAUD", "EURCAD", "EURCHF", "EURGBP", "EURJPY", "EURNZD",
    "EURUSD", "GBPAUD", "GBPCAD", "GBPCHF", "GBPJPY", "GBPNZD", "GBPUSD",
    "NZDCAD", "NZDCHF", "NZDJPY", "NZDUSD", "USDCAD", "USDCHF", "USDJPY",
    "XAGUSD", "XAUUSD",
];

/// Returns true if `symbol` is on the tradable allow-list.
pub fn is_supported_symbol(symbol: &str) -> bool {
    SUPPORTED_SYMBOLS.contains(&symbol)
}

/// Order direction and execution style. One variant per venue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Buy => "Buy",
            OrderType::Sell => "Sell",
            OrderType::BuyLimit => "Buy Limit",
            OrderType::SellLimit => "Sell Limit",
            OrderType::BuyStop => "Buy Stop",
            OrderType::SellStop => "Sell Stop",
        }
    }

    /// True for the long-side variants. Market entry resolves against the
    /// bid for longs and the ask for shorts.
    pub fn is_buy(&self) -> bool {
        matches!(
            self,
            OrderType::Buy | OrderType::BuyLimit | OrderType::BuyStop
        )
    }

    /// True for the two at-market variants, the only ones that may carry
    /// a "NOW" entry.
    pub fn is_market(&self) -> bool {
        matches!(self, OrderType::Buy | OrderType::Sell)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry price: either a fixed level or the "NOW" market sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// Execute at the current live price; resolved to a concrete price by
    /// the lifecycle before risk is computed.
    Market,
    Price(Decimal),
}

impl Entry {
    pub fn is_market(&self) -> bool {
        matches!(self, Entry::Market)
    }

    /// The resolved price, if any.
    pub fn price(&self) -> Option<Decimal> {
        match self {
            Entry::Market => None,
            Entry::Price(p) => Some(*p),
        }
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Market => f.write_str("NOW"),
            Entry::Price(p) => write!(f, "{p}"),
        }
    }
}

/// A validated trade signal.
///
/// Everything except `entry` is immutable after parsing; `entry` moves from
/// `Market` to a concrete price exactly once, when the live quote is
/// fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub order_type: OrderType,

    /// Instrument code, member of [`SUPPORTED_SYMBOLS`].
    pub symbol: String,

    pub entry: Entry,

    pub stop_loss: Decimal,

    /// One or two take-profit levels, in execution order. Each target
    /// receives an equal share of the position.
    pub take_profits: Vec<Decimal>,

    /// Fraction of account equity to risk; attached from configuration,
    /// never parsed from the signal text.
    pub risk_fraction: Decimal,
}

impl TradeSignal {
    /// Replace the market sentinel with a live price.
    ///
    /// Must be called at most once, and only while the entry is still
    /// `Market`.
    pub fn resolve_entry(&mut self, price: Decimal) {
        debug_assert!(self.entry.is_market(), "entry resolved twice");
        self.entry = Entry::Price(price);
    }
}
