//! Free-form signal text parsing.
//!
//! Signals arrive as short multi-line messages, e.g.:
//!
//! ```text
//! BUY GBPUSD
//! Entry NOW
//! SL 1.14336
//! TP 1.28930
//! TP 1.29845
//! ```
//!
//! Line 1 carries the order type and symbol, line 2 the entry (a price or
//! "NOW"), line 3 the stop loss, lines 4-5 one or two take profits. Only
//! the last whitespace-separated token of each line matters, so label
//! words like "Entry" or "SL" are free-form.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{is_supported_symbol, Entry, OrderType, TradeSignal};

/// Maximum number of take-profit levels recognized; extra lines are
/// ignored.
const MAX_TAKE_PROFITS: usize = 2;

/// Why a signal text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("signal needs at least 4 lines: order, entry, stop loss, take profit")]
    InsufficientLines,
    #[error("first line must start with buy/sell (optionally limit/stop)")]
    UnknownOrderType,
    #[error("symbol is not on the tradable instrument list")]
    UnknownSymbol,
    #[error("entry must be a price or NOW")]
    InvalidEntry,
    #[error("stop loss must be a price")]
    InvalidStopLoss,
    #[error("take profit must be a price")]
    InvalidTakeProfit,
}

/// Parse a raw signal message into a [`TradeSignal`].
///
/// Pure function of its input: no I/O, deterministic. `risk_fraction`
/// comes from process configuration.
pub fn parse_signal(text: &str, risk_fraction: Decimal) -> Result<TradeSignal, ParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    // Order, entry, stop loss, and at least one take profit.
    if lines.len() < 4 {
        return Err(ParseError::InsufficientLines);
    }

    let order_type = parse_order_type(lines[0])?;

    let symbol = last_token(lines[0]).to_uppercase();
    if !is_supported_symbol(&symbol) {
        return Err(ParseError::UnknownSymbol);
    }

    let entry_raw = last_token(lines[1]).to_uppercase();
    let entry = if entry_raw == "NOW" {
        Entry::Market
    } else {
        Decimal::from_str(&entry_raw)
            .map(Entry::Price)
            .map_err(|_| ParseError::InvalidEntry)?
    };

    let stop_loss =
        Decimal::from_str(last_token(lines[2])).map_err(|_| ParseError::InvalidStopLoss)?;

    let mut take_profits = Vec::with_capacity(MAX_TAKE_PROFITS);
    for line in lines.iter().skip(3).take(MAX_TAKE_PROFITS) {
        let tp = Decimal::from_str(last_token(line)).map_err(|_| ParseError::InvalidTakeProfit)?;
        take_profits.push(tp);
    }

    Ok(TradeSignal {
        order_type,
        symbol,
        entry,
        stop_loss,
        take_profits,
        risk_fraction,
    })
}

/// Order type from the first line, checked in precedence order so that
/// "buy limit" never matches the bare "buy" prefix.
fn parse_order_type(line: &str) -> Result<OrderType, ParseError> {
    let first = line.to_lowercase();

    if first.contains("buy limit") {
        Ok(OrderType::BuyLimit)
    } else if first.contains("sell limit") {
        Ok(OrderType::SellLimit)
    } else if first.contains("buy stop") {
        Ok(OrderType::BuyStop)
    } else if first.contains("sell stop") {
        Ok(OrderType::SellStop)
    } else if first.starts_with("buy") {
        Ok(OrderType::Buy)
    } else if first.starts_with("sell") {
        Ok(OrderType::Sell)
    } else {
        Err(ParseError::UnknownOrderType)
    }
}

fn last_token(line: &str) -> &str {
    // Lines are pre-trimmed and non-empty, so there is always a token.
    line.split_whitespace().last().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RISK: Decimal = dec!(0.01);

    #[test]
    fn test_parse_basic_buy() {
        let signal = parse_signal(
            "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600",
            RISK,
        )
        .unwrap();

        assert_eq!(signal.order_type, OrderType::Buy);
        assert_eq!(signal.symbol, "GBPUSD");
        assert_eq!(signal.entry, Entry::Price(dec!(1.2500)));
        assert_eq!(signal.stop_loss, dec!(1.2450));
        assert_eq!(signal.take_profits, vec![dec!(1.2600)]);
        assert_eq!(signal.risk_fraction, RISK);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "SELL LIMIT EURUSD\nEntry 1.1000\nSL 1.1050\nTP 1.0900\nTP 1.0850";
        let a = parse_signal(text, RISK).unwrap();
        let b = parse_signal(text, RISK).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_type_precedence() {
        let cases = [
            ("buy limit gbpusd", OrderType::BuyLimit),
            ("Sell Limit GBPUSD", OrderType::SellLimit),
            ("BUY STOP GBPUSD", OrderType::BuyStop),
            ("sell stop gbpusd", OrderType::SellStop),
            ("Buying GBPUSD", OrderType::Buy),
            ("sell gbpusd", OrderType::Sell),
        ];

        for (first_line, expected) in cases {
            let text = format!("{first_line}\nEntry 1.25\nSL 1.24\nTP 1.26");
            let signal = parse_signal(&text, RISK).unwrap();
            assert_eq!(signal.order_type, expected, "line: {first_line}");
        }
    }

    #[test]
    fn test_now_entry_becomes_market_sentinel() {
        let signal = parse_signal(
            "SELL USDJPY\nEntry now\nSL 145.500\nTP 143.000",
            RISK,
        )
        .unwrap();
        assert_eq!(signal.entry, Entry::Market);
    }

    #[test]
    fn test_two_take_profits_keep_order() {
        let signal = parse_signal(
            "BUY EURUSD\nEntry 1.1000\nSL 1.0950\nTP 1.1100\nTP 1.1200",
            RISK,
        )
        .unwrap();
        assert_eq!(signal.take_profits, vec![dec!(1.1100), dec!(1.1200)]);
    }

    #[test]
    fn test_extra_lines_ignored() {
        let signal = parse_signal(
            "BUY EURUSD\nEntry 1.1000\nSL 1.0950\nTP 1.1100\nTP 1.1200\nTP 1.1300\ngood luck",
            RISK,
        )
        .unwrap();
        assert_eq!(signal.take_profits.len(), 2);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let signal = parse_signal(
            "\nBUY GBPUSD\n\n  Entry 1.2500  \nSL 1.2450\n\nTP 1.2600\n",
            RISK,
        )
        .unwrap();
        assert_eq!(signal.symbol, "GBPUSD");
        assert_eq!(signal.take_profits, vec![dec!(1.2600)]);
    }

    #[test]
    fn test_too_few_lines() {
        let err = parse_signal("BUY GBPUSD\nEntry 1.25\nSL 1.24", RISK).unwrap_err();
        assert_eq!(err, ParseError::InsufficientLines);
    }

    #[test]
    fn test_unknown_order_type() {
        let err = parse_signal("HOLD GBPUSD\nEntry 1.25\nSL 1.24\nTP 1.26", RISK).unwrap_err();
        assert_eq!(err, ParseError::UnknownOrderType);
    }

    #[test]
    fn test_unknown_symbol() {
        let err = parse_signal("BUY DOGEUSD\nEntry 1.25\nSL 1.24\nTP 1.26", RISK).unwrap_err();
        assert_eq!(err, ParseError::UnknownSymbol);
    }

    #[test]
    fn test_invalid_entry() {
        let err = parse_signal("BUY GBPUSD\nEntry soon\nSL 1.24\nTP 1.26", RISK).unwrap_err();
        assert_eq!(err, ParseError::InvalidEntry);
    }

    #[test]
    fn test_invalid_stop_loss() {
        let err = parse_signal("BUY GBPUSD\nEntry 1.25\nSL none\nTP 1.26", RISK).unwrap_err();
        assert_eq!(err, ParseError::InvalidStopLoss);
    }

    #[test]
    fn test_invalid_take_profit() {
        let err = parse_signal("BUY GBPUSD\nEntry 1.25\nSL 1.24\nTP moon", RISK).unwrap_err();
        assert_eq!(err, ParseError::InvalidTakeProfit);

        let err = parse_signal("BUY GBPUSD\nEntry 1.25\nSL 1.24\nTP 1.26\nTP moon", RISK)
            .unwrap_err();
        assert_eq!(err, ParseError::InvalidTakeProfit);
    }

    #[test]
    fn test_symbol_is_uppercased() {
        let signal = parse_signal("buy gbpusd\nEntry 1.25\nSL 1.24\nTP 1.26", RISK).unwrap();
        assert_eq!(signal.symbol, "GBPUSD");
    }
}
