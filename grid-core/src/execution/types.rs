//! Wire-level types for the `ExecutionLayer` capability set.

use crate::core::{OrderType, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Exchange-assigned identifier for a placed order. Distinct from
/// `LocalId`, which is generated before any exchange round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeOrderId(pub String);

impl std::fmt::Display for ExchangeOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Acknowledgement returned by `create_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: ExchangeOrderId,
    pub status: crate::core::OrderStatus,
}

/// A single outstanding order as reported by `fetch_open_orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: ExchangeOrderId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Decimal>,
    pub amount: Decimal,
    pub filled: Decimal,
    pub status: crate::core::OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Per-currency balance line from `fetch_balance`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct BalanceLine {
    pub free: Decimal,
    pub used: Decimal,
    pub total: Decimal,
}

pub type Balances = HashMap<String, BalanceLine>;

/// Snapshot of top-of-book / last-trade data from `fetch_ticker`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ticker {
    pub last: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// A fill (trade execution) reported by an execution layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: ExchangeOrderId,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    pub fee_is_quote: bool,
    pub timestamp: DateTime<Utc>,
}
