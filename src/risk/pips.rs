//! Pip-size resolution.
//!
//! Different instrument classes quote at different decimal granularities,
//! so a uniform divisor would misstate risk: gold moves in tenths, silver
//! in thousandths, JPY crosses in hundredths, and most pairs in
//! ten-thousandths. The pip size converts a raw price difference into a
//! pip count.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::signal::Entry;

/// Default pip size for 4-decimal pairs.
const PIP_DEFAULT: Decimal = dec!(0.0001);
/// Pip size for pairs quoted with 3+ fractional digits (JPY crosses).
const PIP_JPY_STYLE: Decimal = dec!(0.01);
/// Gold quotes in tenths.
const PIP_GOLD: Decimal = dec!(0.1);
/// Silver quotes in thousandths.
const PIP_SILVER: Decimal = dec!(0.001);

/// Pip size for `symbol` at the given entry.
///
/// The metal overrides take precedence; for everything else a market-now
/// entry gets the default, and a concrete entry is classified by how many
/// fractional digits its normalized representation carries.
pub fn pip_size(symbol: &str, entry: &Entry) -> Decimal {
    match symbol {
        "XAUUSD" => return PIP_GOLD,
        "XAGUSD" => return PIP_SILVER,
        _ => {}
    }

    match entry.price() {
        None => PIP_DEFAULT,
        Some(price) => {
            // normalize() strips trailing zeros so "145.500" counts one
            // fractional digit, matching how the quote is written.
            if price.normalize().scale() >= 3 {
                PIP_JPY_STYLE
            } else {
                PIP_DEFAULT
            }
        }
    }
}

/// Distance between two prices in whole pips, rounded half-to-even.
pub fn pip_distance(a: Decimal, b: Decimal, pip: Decimal) -> u32 {
    let pips = ((a - b).abs() / pip)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    pips.to_u32().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metal_overrides() {
        assert_eq!(pip_size("XAUUSD", &Entry::Price(dec!(1900.0))), dec!(0.1));
        assert_eq!(pip_size("XAUUSD", &Entry::Market), dec!(0.1));
        assert_eq!(pip_size("XAGUSD", &Entry::Price(dec!(23.456))), dec!(0.001));
    }

    #[test]
    fn test_market_entry_defaults() {
        assert_eq!(pip_size("GBPUSD", &Entry::Market), dec!(0.0001));
        assert_eq!(pip_size("USDJPY", &Entry::Market), dec!(0.0001));
    }

    #[test]
    fn test_fractional_digit_heuristic() {
        // 4-decimal pair, trailing zeros stripped before counting
        assert_eq!(pip_size("GBPUSD", &Entry::Price(dec!(1.2500))), dec!(0.0001));
        assert_eq!(pip_size("GBPUSD", &Entry::Price(dec!(1.25))), dec!(0.0001));
        // 3+ fractional digits quote in hundredths
        assert_eq!(pip_size("USDJPY", &Entry::Price(dec!(145.123))), dec!(0.01));
        assert_eq!(pip_size("GBPUSD", &Entry::Price(dec!(1.14336))), dec!(0.01));
    }

    #[test]
    fn test_pip_size_is_pure() {
        let entry = Entry::Price(dec!(145.123));
        assert_eq!(pip_size("USDJPY", &entry), pip_size("USDJPY", &entry));
    }

    #[test]
    fn test_pip_distance() {
        assert_eq!(pip_distance(dec!(1.2500), dec!(1.2450), dec!(0.0001)), 50);
        // order of arguments does not matter
        assert_eq!(pip_distance(dec!(1.2450), dec!(1.2500), dec!(0.0001)), 50);
        // gold: 5.0 / 0.1 = 50
        assert_eq!(pip_distance(dec!(1900.0), dec!(1895.0), dec!(0.1)), 50);
        assert_eq!(pip_distance(dec!(1.2500), dec!(1.2500), dec!(0.0001)), 0);
    }
}
