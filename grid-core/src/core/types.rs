//! Shared primitive types used across the grid/DCA/hybrid kernel.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Local identifier for a grid order, DCA deal, or safety order.
///
/// Distinct from the exchange's own order id (`execution::types::OrderId`,
/// a `String`): this is generated locally the moment a component decides to
/// place an order, before any exchange round-trip, so state can be tracked
/// even while the placement call is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct LocalId(pub u64);

impl LocalId {
    /// Generate a new id, unique within this process.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{:016x}", self.0)
    }
}

/// Order side (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type understood by the execution layer.
///
/// No order types beyond limit and market are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

/// Order lifecycle status for orders known to the execution layer.
///
/// This is broader than a grid order's own state machine (see
/// `grid::order_manager::GridOrderStatus`): the execution layer additionally
/// distinguishes partial fills and exchange-side rejection/expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OrderStatus {
    Pending,
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}
