//! Simulated venue for tests and dry runs.
//!
//! Keeps an in-memory balance and quote book, accepts every order unless
//! told otherwise, and records submitted tickets so callers can assert on
//! them. No real money involved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::signal::SUPPORTED_SYMBOLS;

use super::{AccountInfo, OrderReceipt, Quote, TradingVenue, VenueError, VenueResult, VenueSession};

/// One order ticket as it reached the venue.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTicket {
    pub kind: &'static str,
    pub symbol: String,
    pub volume: Decimal,
    pub entry: Option<Decimal>,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

/// In-memory venue. Cloning shares the ticket log, so tickets submitted
/// through a session remain visible on the venue handle.
#[derive(Clone)]
pub struct SimVenue {
    balance: Decimal,
    quotes: HashMap<String, Quote>,
    /// 0-based submission indices that will be rejected. Fixed at build
    /// time.
    rejected_tickets: HashSet<usize>,
    tickets: Arc<RwLock<Vec<SubmittedTicket>>>,
}

impl SimVenue {
    /// Venue with the given balance and a flat default quote for every
    /// supported symbol.
    pub fn new(balance: Decimal) -> Self {
        let mut quotes = HashMap::new();
        for symbol in SUPPORTED_SYMBOLS {
            quotes.insert(
                symbol.to_string(),
                Quote {
                    bid: dec!(1.0000),
                    ask: dec!(1.0002),
                },
            );
        }

        Self {
            balance,
            quotes,
            rejected_tickets: HashSet::new(),
            tickets: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Override the quote for one symbol.
    pub fn with_quote(mut self, symbol: &str, bid: Decimal, ask: Decimal) -> Self {
        self.quotes.insert(symbol.to_string(), Quote { bid, ask });
        self
    }

    /// Reject the `index`-th submitted ticket (0-based).
    pub fn reject_ticket(mut self, index: usize) -> Self {
        self.rejected_tickets.insert(index);
        self
    }

    /// Tickets submitted so far, in submission order.
    pub async fn submitted(&self) -> Vec<SubmittedTicket> {
        self.tickets.read().await.clone()
    }

    async fn submit(
        &self,
        kind: &'static str,
        symbol: &str,
        volume: Decimal,
        entry: Option<Decimal>,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        let mut tickets = self.tickets.write().await;
        let index = tickets.len();
        tickets.push(SubmittedTicket {
            kind,
            symbol: symbol.to_string(),
            volume,
            entry,
            stop_loss,
            take_profit,
        });

        if self.rejected_tickets.contains(&index) {
            debug!(kind, symbol, index, "sim venue rejecting ticket");
            return Err(VenueError::Rejected(format!(
                "{kind} {symbol} refused by simulated venue"
            )));
        }

        debug!(kind, symbol, %volume, "sim venue accepted ticket");
        Ok(OrderReceipt {
            order_id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            volume,
        })
    }
}

#[async_trait]
impl TradingVenue for SimVenue {
    async fn deploy_if_needed(&self) -> VenueResult<()> {
        Ok(())
    }

    async fn wait_until_connected(&self) -> VenueResult<()> {
        Ok(())
    }

    async fn open_session(&self) -> VenueResult<Box<dyn VenueSession>> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl VenueSession for SimVenue {
    async fn account_info(&self) -> VenueResult<AccountInfo> {
        Ok(AccountInfo {
            balance: self.balance,
            currency: "USD".to_string(),
        })
    }

    async fn quote(&self, symbol: &str) -> VenueResult<Quote> {
        self.quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| VenueError::UnknownSymbol(symbol.to_string()))
    }

    async fn market_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("market_buy", symbol, volume, None, stop_loss, take_profit)
            .await
    }

    async fn market_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("market_sell", symbol, volume, None, stop_loss, take_profit)
            .await
    }

    async fn limit_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("limit_buy", symbol, volume, Some(entry), stop_loss, take_profit)
            .await
    }

    async fn limit_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("limit_sell", symbol, volume, Some(entry), stop_loss, take_profit)
            .await
    }

    async fn stop_buy(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("stop_buy", symbol, volume, Some(entry), stop_loss, take_profit)
            .await
    }

    async fn stop_sell(
        &self,
        symbol: &str,
        volume: Decimal,
        entry: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> VenueResult<OrderReceipt> {
        self.submit("stop_sell", symbol, volume, Some(entry), stop_loss, take_profit)
            .await
    }
}
