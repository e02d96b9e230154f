//! Trade lifecycle state machine.
//!
//! Sequences one conversation through parse -> connect -> quote -> size ->
//! present -> confirm -> submit. The session suspends only while waiting
//! for the next user message or for a venue call; every venue call runs
//! under a bounded timeout. All terminal transitions discard the pending
//! signal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::report::render_trade_report;
use crate::risk::{compute, RiskSummary};
use crate::signal::{parse_signal, OrderType, TradeSignal};
use crate::venue::{OrderReceipt, TradingVenue, VenueError, VenueResult, VenueSession};

/// Help text shared by the console host and corrective prompts.
pub const HELP_TEXT: &str = "Commands:\n\
    /trade - enter a trade and execute it\n\
    /calculate - size a trade without executing\n\
    /cancel - cancel the current action\n\n\
    Signal format:\n\
    BUY GBPUSD\n\
    Entry NOW\n\
    SL 1.14336\n\
    TP 1.28930\n\
    TP 1.29845\n\n\
    Use NOW as the entry for market execution.";

const SIGNAL_EXAMPLE: &str = "BUY GBPUSD\nEntry NOW\nSL 1.14336\nTP 1.28930";

/// What the user asked for when the session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowIntent {
    /// Size the trade and place the orders straight away.
    Execute,
    /// Size the trade first, then ask before placing anything.
    CalculateOnly,
}

/// Persisted stage of a session; transient work (connecting, sizing,
/// submitting) happens inside a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingSignal,
    AwaitingConfirmation,
    Terminated,
}

/// How the transport should render a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderHint {
    Plain,
    Preformatted,
}

/// One outbound message for the messaging collaborator to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub render: RenderHint,
}

impl Reply {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            render: RenderHint::Plain,
        }
    }

    fn preformatted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            render: RenderHint::Preformatted,
        }
    }
}

/// One conversation's working state. Mutated only by [`TradeFlow`]
/// transition handlers.
#[derive(Debug, Clone)]
pub struct LifecycleSession {
    pub stage: Stage,
    pub intent: FlowIntent,
    pub started_at: DateTime<Utc>,
    pending: Option<TradeSignal>,
}

impl LifecycleSession {
    pub fn new(intent: FlowIntent) -> Self {
        Self {
            stage: Stage::AwaitingSignal,
            intent,
            started_at: Utc::now(),
            pending: None,
        }
    }

    /// The parsed signal awaiting confirmation, if any.
    pub fn pending(&self) -> Option<&TradeSignal> {
        self.pending.as_ref()
    }
}

/// Drives sessions through their transitions against a venue.
pub struct TradeFlow {
    config: AppConfig,
    venue: Arc<dyn TradingVenue>,
}

impl TradeFlow {
    pub fn new(config: AppConfig, venue: Arc<dyn TradingVenue>) -> Self {
        Self { config, venue }
    }

    /// Handle the next user message for a session, returning the replies
    /// to deliver. The session's stage is updated in place.
    pub async fn on_message(&self, session: &mut LifecycleSession, text: &str) -> Vec<Reply> {
        match session.stage {
            Stage::AwaitingSignal => self.on_signal_text(session, text).await,
            Stage::AwaitingConfirmation => self.on_confirmation(session, text).await,
            Stage::Terminated => vec![Reply::plain(
                "This session is over. Send /trade or /calculate to start a new one.",
            )],
        }
    }

    /// Cancel from any non-terminal stage; clears the pending signal
    /// immediately.
    pub fn cancel(&self, session: &mut LifecycleSession) -> Reply {
        session.pending = None;
        session.stage = Stage::Terminated;
        info!("session cancelled");
        Reply::plain("Action cancelled.")
    }

    async fn on_signal_text(&self, session: &mut LifecycleSession, text: &str) -> Vec<Reply> {
        let mut signal = match parse_signal(text, self.config.risk_fraction) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "signal rejected");
                // Recoverable: stay in AwaitingSignal and re-prompt.
                return vec![Reply::plain(format!(
                    "Could not read that signal: {e}.\n\nExample:\n{SIGNAL_EXAMPLE}"
                ))];
            }
        };

        info!(
            order_type = %signal.order_type,
            symbol = %signal.symbol,
            "signal accepted"
        );
        let mut replies = vec![Reply::plain(
            "Signal accepted. Connecting to the trading venue...",
        )];

        match self.size_trade(&mut signal).await {
            Err(reply) => {
                replies.push(reply);
                session.pending = None;
                session.stage = Stage::Terminated;
            }
            Ok((venue_session, balance, summary)) => {
                replies.push(Reply::preformatted(render_trade_report(
                    &signal, balance, &summary,
                )));

                match session.intent {
                    FlowIntent::Execute => {
                        replies.push(Reply::plain("Placing orders..."));
                        replies
                            .push(self.submit_orders(venue_session.as_ref(), &signal, &summary).await);
                        session.pending = None;
                        session.stage = Stage::Terminated;
                    }
                    FlowIntent::CalculateOnly => {
                        session.pending = Some(signal);
                        session.stage = Stage::AwaitingConfirmation;
                        replies.push(Reply::plain(
                            "Enter this trade? Reply /yes to place the orders or /no to cancel.",
                        ));
                    }
                }
            }
        }

        replies
    }

    async fn on_confirmation(&self, session: &mut LifecycleSession, text: &str) -> Vec<Reply> {
        let affirmative = matches!(text.trim().to_lowercase().as_str(), "/yes" | "yes");
        if !affirmative {
            session.pending = None;
            session.stage = Stage::Terminated;
            return vec![Reply::plain("Cancelled. No orders were placed.")];
        }

        let Some(mut signal) = session.pending.take() else {
            session.stage = Stage::Terminated;
            return vec![Reply::plain(
                "No pending trade. Send /trade or /calculate to start again.",
            )];
        };

        session.stage = Stage::Terminated;
        let mut replies = vec![Reply::plain("Confirmed. Connecting to the trading venue...")];

        // The balance may have moved since the calculation, so size again
        // against a fresh session before submitting.
        match self.size_trade(&mut signal).await {
            Err(reply) => replies.push(reply),
            Ok((venue_session, _balance, summary)) => {
                replies.push(Reply::plain("Placing orders..."));
                replies.push(self.submit_orders(venue_session.as_ref(), &signal, &summary).await);
            }
        }

        replies
    }

    /// Connect, resolve a market entry if needed, and compute risk.
    ///
    /// On failure the returned reply is the single user-visible message
    /// for this terminal path; details go to the log.
    async fn size_trade(
        &self,
        signal: &mut TradeSignal,
    ) -> Result<(Box<dyn VenueSession>, Decimal, RiskSummary), Reply> {
        let venue_session = match self.connect().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "venue connection failed");
                return Err(Reply::plain(format!(
                    "Could not reach the trading venue: {e}. Please try again later."
                )));
            }
        };

        let account = self
            .bounded("account_info", venue_session.account_info())
            .await
            .map_err(|e| {
                error!(error = %e, "balance fetch failed");
                Reply::plain(format!("Could not read the account balance: {e}."))
            })?;

        if signal.entry.is_market() {
            let quote = self
                .bounded("quote", venue_session.quote(&signal.symbol))
                .await
                .map_err(|e| {
                    error!(symbol = %signal.symbol, error = %e, "quote fetch failed");
                    Reply::plain(format!("Could not fetch a live price: {e}."))
                })?;

            let price = if signal.order_type.is_buy() {
                quote.bid
            } else {
                quote.ask
            };
            info!(symbol = %signal.symbol, %price, "resolved market entry");
            signal.resolve_entry(price);
        }

        let summary = compute(signal, account.balance).map_err(|e| {
            warn!(error = %e, "risk computation failed");
            Reply::plain(format!("Cannot size this trade: {e}."))
        })?;

        info!(
            balance = %account.balance,
            stop_loss_pips = summary.stop_loss_pips,
            position_size = %summary.position_size,
            "risk computed"
        );

        Ok((venue_session, account.balance, summary))
    }

    async fn connect(&self) -> VenueResult<Box<dyn VenueSession>> {
        self.bounded("deploy", self.venue.deploy_if_needed()).await?;
        self.bounded("wait_connected", self.venue.wait_until_connected())
            .await?;
        self.bounded("open_session", self.venue.open_session()).await
    }

    /// Run a venue call under the configured wait bound.
    async fn bounded<T, F>(&self, what: &'static str, call: F) -> VenueResult<T>
    where
        F: Future<Output = VenueResult<T>>,
    {
        let secs = self.config.connect_timeout_secs;
        match timeout(Duration::from_secs(secs), call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(what, secs, "venue call timed out");
                Err(VenueError::Timeout { secs })
            }
        }
    }

    /// Submit one order per take profit, each with an equal share of the
    /// position. Tickets are independent: a rejection is reported for its
    /// target and does not block the others.
    async fn submit_orders(
        &self,
        venue_session: &dyn VenueSession,
        signal: &TradeSignal,
        summary: &RiskSummary,
    ) -> Reply {
        let share = summary.position_size / Decimal::from(signal.take_profits.len() as u64);
        let mut lines = Vec::with_capacity(signal.take_profits.len());

        for (i, take_profit) in signal.take_profits.iter().enumerate() {
            let target = i + 1;
            match self.submit_one(venue_session, signal, share, *take_profit).await {
                Ok(receipt) => {
                    info!(
                        target,
                        order_id = %receipt.order_id,
                        volume = %receipt.volume,
                        "order placed"
                    );
                    lines.push(format!("TP {target}: order placed (id {})", receipt.order_id));
                }
                Err(e) => {
                    error!(target, error = %e, "order submission failed");
                    lines.push(format!("TP {target}: order failed: {e}"));
                }
            }
        }

        Reply::plain(lines.join("\n"))
    }

    /// Total 6-way dispatch: one venue operation per order type.
    async fn submit_one(
        &self,
        venue_session: &dyn VenueSession,
        signal: &TradeSignal,
        volume: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        let symbol = signal.symbol.as_str();
        let stop_loss = signal.stop_loss;
        let entry = || {
            signal
                .entry
                .price()
                .ok_or_else(|| VenueError::Rejected("entry price not resolved".to_string()))
        };

        let call = match signal.order_type {
            OrderType::Buy => venue_session.market_buy(symbol, volume, stop_loss, take_profit),
            OrderType::Sell => venue_session.market_sell(symbol, volume, stop_loss, take_profit),
            OrderType::BuyLimit => {
                venue_session.limit_buy(symbol, volume, entry()?, stop_loss, take_profit)
            }
            OrderType::SellLimit => {
                venue_session.limit_sell(symbol, volume, entry()?, stop_loss, take_profit)
            }
            OrderType::BuyStop => {
                venue_session.stop_buy(symbol, volume, entry()?, stop_loss, take_profit)
            }
            OrderType::SellStop => {
                venue_session.stop_sell(symbol, volume, entry()?, stop_loss, take_profit)
            }
        };

        self.bounded("submit_order", call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Entry;
    use crate::venue::SimVenue;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    fn flow(venue: SimVenue) -> TradeFlow {
        TradeFlow::new(AppConfig::default(), Arc::new(venue))
    }

    fn render_hints(replies: &[Reply]) -> Vec<RenderHint> {
        replies.iter().map(|r| r.render).collect()
    }

    #[tokio::test]
    async fn test_calculate_flow_presents_report_and_awaits_confirmation() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        let replies = flow
            .on_message(
                &mut session,
                "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600",
            )
            .await;

        assert_eq!(session.stage, Stage::AwaitingConfirmation);
        assert!(session.pending().is_some());
        assert!(render_hints(&replies).contains(&RenderHint::Preformatted));
        assert!(replies.last().unwrap().text.contains("/yes"));
        // Nothing submitted yet.
        assert!(venue.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_reprompts_without_advancing() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue);
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        let replies = flow.on_message(&mut session, "what is a pip?").await;

        assert_eq!(session.stage, Stage::AwaitingSignal);
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.contains("Example:"));
    }

    #[tokio::test]
    async fn test_sell_market_entry_resolves_against_ask() {
        let venue = SimVenue::new(dec!(10000)).with_quote("EURUSD", dec!(1.0998), dec!(1.1000));
        let flow = flow(venue);
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(&mut session, "SELL EURUSD\nEntry NOW\nSL 1.1050\nTP 1.0900")
            .await;

        let pending = session.pending().unwrap();
        assert_eq!(pending.entry, Entry::Price(dec!(1.1000)));
    }

    #[tokio::test]
    async fn test_buy_market_entry_resolves_against_bid() {
        let venue = SimVenue::new(dec!(10000)).with_quote("GBPUSD", dec!(1.2500), dec!(1.2502));
        let flow = flow(venue);
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(&mut session, "BUY GBPUSD\nEntry NOW\nSL 1.2450\nTP 1.2600")
            .await;

        let pending = session.pending().unwrap();
        assert_eq!(pending.entry, Entry::Price(dec!(1.2500)));
    }

    #[tokio::test]
    async fn test_confirmation_yes_splits_position_across_targets() {
        let venue = SimVenue::new(dec!(10000)).with_quote("GBPUSD", dec!(1.2500), dec!(1.2502));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(
            &mut session,
            "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600\nTP 1.2700",
        )
        .await;
        let replies = flow.on_message(&mut session, "/yes").await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(session.pending().is_none());

        let tickets = venue.submitted().await;
        assert_eq!(tickets.len(), 2);
        // 0.2 lots split evenly across two targets.
        assert_eq!(tickets[0].volume, dec!(0.1));
        assert_eq!(tickets[1].volume, dec!(0.1));
        assert_eq!(tickets[0].kind, "market_buy");
        assert_eq!(tickets[0].take_profit, dec!(1.2600));
        assert_eq!(tickets[1].take_profit, dec!(1.2700));
        assert!(replies.last().unwrap().text.contains("order placed"));
    }

    #[tokio::test]
    async fn test_confirmation_no_cancels_without_submitting() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600")
            .await;
        let replies = flow.on_message(&mut session, "/no").await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(session.pending().is_none());
        assert!(replies[0].text.contains("Cancelled"));
        assert!(venue.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_confirmation_cancels() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600")
            .await;
        flow.on_message(&mut session, "maybe later").await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(venue.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_execute_intent_submits_limit_orders_directly() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::Execute);

        flow.on_message(
            &mut session,
            "BUY LIMIT GBPUSD\nEntry 1.2400\nSL 1.2350\nTP 1.2500",
        )
        .await;

        assert_eq!(session.stage, Stage::Terminated);
        let tickets = venue.submitted().await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].kind, "limit_buy");
        assert_eq!(tickets[0].entry, Some(dec!(1.2400)));
    }

    #[tokio::test]
    async fn test_partial_submission_failure_reports_both_outcomes() {
        let venue = SimVenue::new(dec!(10000)).reject_ticket(1);
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::Execute);

        let replies = flow
            .on_message(
                &mut session,
                "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600\nTP 1.2700",
            )
            .await;

        assert_eq!(session.stage, Stage::Terminated);
        // The second rejection did not stop the first ticket, and both
        // outcomes appear in the report.
        let tickets = venue.submitted().await;
        assert_eq!(tickets.len(), 2);
        let outcome = &replies.last().unwrap().text;
        assert!(outcome.contains("TP 1: order placed"));
        assert!(outcome.contains("TP 2: order failed"));
    }

    #[tokio::test]
    async fn test_zero_width_stop_terminates_with_diagnostic() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue.clone());
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        let replies = flow
            .on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2500\nTP 1.2600")
            .await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(session.pending().is_none());
        assert!(replies.last().unwrap().text.contains("0 pips"));
        assert!(venue.submitted().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_pending() {
        let venue = SimVenue::new(dec!(10000));
        let flow = flow(venue);
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        flow.on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600")
            .await;
        assert!(session.pending().is_some());

        let reply = flow.cancel(&mut session);
        assert_eq!(session.stage, Stage::Terminated);
        assert!(session.pending().is_none());
        assert!(reply.text.contains("cancelled"));
    }

    struct DownVenue;

    #[async_trait]
    impl TradingVenue for DownVenue {
        async fn deploy_if_needed(&self) -> VenueResult<()> {
            Err(VenueError::Connectivity("broker gateway offline".to_string()))
        }

        async fn wait_until_connected(&self) -> VenueResult<()> {
            Ok(())
        }

        async fn open_session(&self) -> VenueResult<Box<dyn VenueSession>> {
            Err(VenueError::Connectivity("broker gateway offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_connectivity_failure_is_terminal() {
        let flow = TradeFlow::new(AppConfig::default(), Arc::new(DownVenue));
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        let replies = flow
            .on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600")
            .await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(replies
            .last()
            .unwrap()
            .text
            .contains("Could not reach the trading venue"));
    }

    struct StalledVenue;

    #[async_trait]
    impl TradingVenue for StalledVenue {
        async fn deploy_if_needed(&self) -> VenueResult<()> {
            Ok(())
        }

        async fn wait_until_connected(&self) -> VenueResult<()> {
            std::future::pending().await
        }

        async fn open_session(&self) -> VenueResult<Box<dyn VenueSession>> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_venue_times_out() {
        let config = AppConfig {
            connect_timeout_secs: 5,
            ..AppConfig::default()
        };
        let flow = TradeFlow::new(config, Arc::new(StalledVenue));
        let mut session = LifecycleSession::new(FlowIntent::CalculateOnly);

        let replies = flow
            .on_message(&mut session, "BUY GBPUSD\nEntry 1.2500\nSL 1.2450\nTP 1.2600")
            .await;

        assert_eq!(session.stage, Stage::Terminated);
        assert!(replies.last().unwrap().text.contains("5s"));
    }
}
