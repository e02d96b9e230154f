//! Position sizing and profit/loss projection.
//!
//! Sizing is risk-first: the account may lose at most `risk_fraction` of
//! its balance if the stop is hit, assuming a fixed pip value of 10
//! currency units per pip per lot. The size is floored, never rounded up,
//! so realized risk cannot exceed the configured fraction.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::signal::TradeSignal;

use super::pips::{pip_distance, pip_size};

/// Monetary value of one pip for a one-lot position.
pub const PIP_VALUE_PER_LOT: Decimal = dec!(10);

/// Why a signal cannot be sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("entry is still at-market; resolve a live price before sizing")]
    UnresolvedEntry,
    #[error("pip size resolved to zero")]
    ZeroMultiplier,
    #[error("stop loss is 0 pips from entry; check the entry and SL prices")]
    ZeroWidthStop,
}

/// Computed risk figures for one signal. Derived data, never persisted
/// beyond the lifecycle that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSummary {
    pub stop_loss_pips: u32,
    pub take_profit_pips: Vec<u32>,
    /// Lots, floored to two decimal places.
    pub position_size: Decimal,
    pub potential_loss: Decimal,
    /// Projected profit per target, each over an equal share of the
    /// position.
    pub target_profits: Vec<Decimal>,
    pub total_profit: Decimal,
}

/// Size a signal against the account balance.
pub fn compute(signal: &TradeSignal, balance: Decimal) -> Result<RiskSummary, RiskError> {
    let entry = signal.entry.price().ok_or(RiskError::UnresolvedEntry)?;

    let pip = pip_size(&signal.symbol, &signal.entry);
    if pip.is_zero() {
        return Err(RiskError::ZeroMultiplier);
    }

    let stop_loss_pips = pip_distance(signal.stop_loss, entry, pip);
    if stop_loss_pips == 0 {
        return Err(RiskError::ZeroWidthStop);
    }

    let position_size = ((balance * signal.risk_fraction)
        / Decimal::from(stop_loss_pips)
        / PIP_VALUE_PER_LOT)
        .round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity);

    let take_profit_pips: Vec<u32> = signal
        .take_profits
        .iter()
        .map(|tp| pip_distance(*tp, entry, pip))
        .collect();

    let potential_loss = (position_size * PIP_VALUE_PER_LOT * Decimal::from(stop_loss_pips))
        .round_dp(2);

    // Each target absorbs an equal share of the position.
    let share = Decimal::ONE / Decimal::from(signal.take_profits.len() as u64);
    let target_profits: Vec<Decimal> = take_profit_pips
        .iter()
        .map(|pips| {
            (position_size * PIP_VALUE_PER_LOT * share * Decimal::from(*pips)).round_dp(2)
        })
        .collect();
    let total_profit: Decimal = target_profits.iter().sum();

    Ok(RiskSummary {
        stop_loss_pips,
        take_profit_pips,
        position_size,
        potential_loss,
        target_profits,
        total_profit,
    })
}
