//! Output types for a single backtest run.

use chrono::{DateTime, Utc};
use grid_core::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    /// Realized P/L if this fill closed a grid cycle, `None` otherwise.
    pub cycle_profit: Option<Decimal>,
}

/// Everything a backtest run reports, including exposure tracking and
/// price-left-grid counting alongside the standard return/drawdown metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestResult {
    pub symbol: String,
    pub total_return_pct: Decimal,
    pub total_pnl: Decimal,
    pub final_equity: Decimal,
    pub max_drawdown_pct: Decimal,
    pub total_trades: u64,
    pub win_rate: Decimal,
    pub completed_cycles: u64,
    pub grid_fill_rate: Decimal,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub profit_factor: f64,
    pub capital_efficiency: Decimal,
    pub total_fees: Decimal,
    pub equity_curve: Vec<EquityPoint>,
    pub trade_history: Vec<TradeRecord>,
    pub stopped_by_risk: bool,
    pub stop_reason: Option<String>,
    pub duration_seconds: i64,
    /// Number of candles whose close left the grid's bounds entirely.
    pub price_left_grid_count: u64,
    /// Largest single-bar one-sided exposure (buy-side or sell-side
    /// notional) seen over the run, as a fraction of initial balance.
    pub max_one_sided_exposure: Decimal,
    pub avg_profit_per_cycle: Decimal,
}

impl BacktestResult {
    pub fn is_profitable(&self) -> bool {
        self.total_pnl > Decimal::ZERO
    }
}
