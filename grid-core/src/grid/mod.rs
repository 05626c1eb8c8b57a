//! Grid trading kernel: C3 GridCalculator, C5 GridOrderManager, C9
//! TrailingGridManager.

pub mod calculator;
pub mod order_manager;
pub mod trailing;

pub use calculator::{GridCalculator, GridLevel};
pub use order_manager::{GridCycle, GridOrderManager, GridOrderState, GridOrderStatus, ReconciliationAction, ReconciliationReport};
pub use trailing::{ShiftEvent, TrailingGridManager};
