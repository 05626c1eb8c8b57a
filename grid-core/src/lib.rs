//! grid-core — the grid/DCA/hybrid trading kernel shared by the live bot
//! and its backtesting twin.
//!
//! ## Modules
//! - [`core`]: shared primitive types (`LocalId`, `Side`, `OrderType`,
//! `OrderStatus`) and the kernel's typed errors.
//! - [`time`]: C1 TimeProvider — live wall-clock vs backtest-controlled
//! clock behind one trait.
//! - [`execution`]: C2 ExecutionLayer and C11 MarketSimulator.
//! - [`grid`]: C3 GridCalculator, C5 GridOrderManager, C9
//! TrailingGridManager.
//! - [`dca`]: C6 DCAPositionManager, C7 DCASignalGenerator, C8
//! DCATrailingStop.
//! - [`risk`]: C4 RiskManager.
//! - [`hybrid`]: C10 HybridCoordinator.
//! - [`snapshot`]: C14 SnapshotStore.
//! - [`config`]: per-bot runtime TOML configuration.
//! - [`resilience`]: backoff/circuit-breaker wrapping outbound exchange
//! calls.
//! - [`utils`]: structured logging setup.
//!
//! Backtesting (C12 BacktestSimulator, C13 Optimizer) lives in the sibling
//! `grid-backtest` crate, which depends on this one.

pub mod config;
pub mod core;
pub mod dca;
pub mod execution;
pub mod grid;
pub mod hybrid;
pub mod resilience;
pub mod risk;
pub mod snapshot;
#[cfg(test)]
pub mod testing;
pub mod time;
pub mod utils;

pub use core::{KernelError, LocalId, OrderStatus, OrderType, Side};
pub use dca::{DCADeal, DCAPositionManager, DCASignalGenerator, DCATrailingStop, DealStatus};
pub use execution::{ExecutionLayer, MarketSimulator};
pub use grid::{GridCalculator, GridOrderManager, TrailingGridManager};
pub use hybrid::{CoordinatedDecision, HybridCoordinator, TradingMode};
pub use risk::RiskManager;
pub use snapshot::SnapshotStore;
pub use time::{BacktestTimeProvider, LiveTimeProvider, TimeProvider};

pub use anyhow::{Error, Result};

/// Convenience re-exports for binaries and the backtest crate.
pub mod prelude {
    pub use crate::config::{BotConfig, StrategyKind};
    pub use crate::core::{KernelError, LocalId, OrderStatus, OrderType, Side};
    pub use crate::dca::{DCADeal, DCAPositionManager, DCASignalGenerator, DCATrailingStop};
    pub use crate::execution::{ExecutionLayer, MarketSimulator};
    pub use crate::grid::{GridCalculator, GridOrderManager, TrailingGridManager};
    pub use crate::hybrid::{CoordinatedDecision, HybridCoordinator};
    pub use crate::risk::RiskManager;
    pub use crate::snapshot::SnapshotStore;
    pub use crate::time::TimeProvider;
    pub use crate::{Error, Result};
}
