//! Trade report rendering.
//!
//! Read-only view over a signal and its computed risk figures; all the
//! numbers arrive pre-computed from the risk engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::risk::RiskSummary;
use crate::signal::TradeSignal;

const KEY_WIDTH: usize = 22;

/// Render the fixed-order trade information report sent back to the user
/// as preformatted text.
pub fn render_trade_report(
    signal: &TradeSignal,
    balance: Decimal,
    summary: &RiskSummary,
) -> String {
    let mut out = String::from("Trade Information\n");
    let mut row = |key: &str, value: String| {
        out.push_str(&format!("{key:<KEY_WIDTH$} {value}\n"));
    };

    row(signal.order_type.as_str(), signal.symbol.clone());
    row("Entry", signal.entry.to_string());
    row("Stop Loss", format!("{} pips", summary.stop_loss_pips));

    for (i, pips) in summary.take_profit_pips.iter().enumerate() {
        row(&format!("TP {}", i + 1), format!("{pips} pips"));
    }

    row(
        "Risk Factor",
        format!("{} %", (signal.risk_fraction * dec!(100)).normalize()),
    );
    row("Position Size (lots)", summary.position_size.to_string());
    row("Current Balance", money(balance));
    row("Potential Loss", money(summary.potential_loss));

    for (i, profit) in summary.target_profits.iter().enumerate() {
        row(&format!("TP {} Profit", i + 1), money(*profit));
    }

    row("Total Profit", money(summary.total_profit));

    out
}

fn money(amount: Decimal) -> String {
    format!("$ {:.2}", amount)
}
