//! ExecutionLayer (C2) — place/cancel/fetch orders, ticker, balance,
//! swappable live vs simulated.
//!
//! The live implementation delegates to an exchange client behind the
//! `resilience` module's backoff/circuit breaker; the backtest
//! implementation is [`simulated::MarketSimulator`] (C11).

pub mod simulated;
pub mod types;

pub use simulated::MarketSimulator;
pub use types::{Balances, BalanceLine, ExchangeOrderId, Fill, OpenOrder, OrderAck, Ticker};

use crate::core::errors::ExecutionError;
use crate::core::{OrderType, Side};
use rust_decimal::Decimal;

/// Capability set every execution backend (live exchange client or
/// backtest `MarketSimulator`) must provide. Implementations must tolerate
/// an idempotent cancel of an already-filled order.
pub trait ExecutionLayer: Send + Sync {
    async fn create_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: Side,
        amount: Decimal,
        price: Option<Decimal>,
    ) -> Result<OrderAck, ExecutionError>;

    async fn cancel_order(&self, id: &ExchangeOrderId, symbol: Option<&str>) -> Result<(), ExecutionError>;

    async fn cancel_all_orders(&self, symbol: Option<&str>) -> Result<(), ExecutionError>;

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OpenOrder>, ExecutionError>;

    async fn fetch_balance(&self) -> Result<Balances, ExecutionError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker, ExecutionError>;
}
