//! Trading-venue collaborator interface.
//!
//! The lifecycle talks to the venue through these traits only: deploy and
//! connect an account, read balance and quotes, and submit orders in the
//! six supported variants. [`SimVenue`] is the in-process implementation
//! used by tests and the demo CLI; a real broker client plugs in behind
//! the same seam.

mod sim;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sim::{SimVenue, SubmittedTicket};

pub type VenueResult<T> = Result<T, VenueError>;

/// Venue-side failures.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    #[error("account deploy failed: {0}")]
    Deploy(String),
    #[error("venue unreachable: {0}")]
    Connectivity(String),
    #[error("venue did not respond within {secs}s")]
    Timeout { secs: u64 },
    #[error("no quote available for {0}")]
    UnknownSymbol(String),
    #[error("order rejected: {0}")]
    Rejected(String),
}

/// Account state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: Decimal,
    pub currency: String,
}

/// Two-sided quote for one instrument.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

/// Acknowledgement for one accepted order ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub symbol: String,
    pub volume: Decimal,
}

/// Venue account lifecycle: deploy, wait for broker connection, open a
/// session.
#[async_trait]
pub trait TradingVenue: Send + Sync {
    /// Deploy the account if it is not already deployed.
    async fn deploy_if_needed(&self) -> VenueResult<()>;

    /// Block until the account is connected to the broker.
    async fn wait_until_connected(&self) -> VenueResult<()>;

    /// Open a synchronized session for balance, quotes, and orders.
    async fn open_session(&self) -> VenueResult<Box<dyn VenueSession>>;
}

/// An open, synchronized venue session.
///
/// One submission method per order-type variant, mirroring the venue's
/// own operation set; the entry price is implicit (current market) for
/// the two market variants.
#[async_trait]
pub trait VenueSession: Send + Sync {
    async fn account_info(&self) -> VenueResult<AccountInfo>;

    async fn quote(&self, symbol: &str) -> VenueResult<Quote>;

    async fn market_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;

    async fn market_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;

    async fn limit_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;

    async fn limit_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;

    async fn stop_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;

    async fn stop_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt>;
}
