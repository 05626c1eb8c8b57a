//! `GridBacktestConfig` — the backtest-only configuration surface,
//! distinct from `grid_core::config::BotConfig` because fields like
//! `initial_balance` and `auto_bounds` only make sense offline.

use anyhow::Context;
use grid_strategies::{DirectionBias, FeeSchedule, GridSpacing, TrailingGridConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BacktestConfigError {
    #[error("num_levels must be >= 2, got {0}")]
    TooFewLevels(u32),
    #[error("amount_per_grid must be positive")]
    NonPositiveAmount,
    #[error("profit_per_grid must be positive")]
    NonPositiveProfit,
    #[error("initial_balance must be positive")]
    NonPositiveBalance,
    #[error("auto_bounds=false requires explicit upper_price/lower_price")]
    MissingExplicitBounds,
    #[error("upper_price must be greater than lower_price")]
    BoundsReversed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridBacktestConfig {
    pub symbol: String,
    pub grid_spacing: GridSpacing,
    pub num_levels: u32,
    pub amount_per_grid: Decimal,
    pub profit_per_grid: Decimal,
    pub atr_period: u32,
    pub atr_multiplier: Decimal,
    /// When true, bounds are derived from ATR over the first
    /// `atr_period + 1` candles; when false, `upper_price`/`lower_price`
    /// must be set explicitly.
    pub auto_bounds: bool,
    #[serde(default)]
    pub upper_price: Option<Decimal>,
    #[serde(default)]
    pub lower_price: Option<Decimal>,
    #[serde(default)]
    pub direction: DirectionBias,
    pub initial_balance: Decimal,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub slippage: Decimal,
    #[serde(default)]
    pub stop_loss_pct: Option<Decimal>,
    #[serde(default)]
    pub max_drawdown_pct: Option<Decimal>,
    /// Equity return fraction that ends the run early with
    /// `stop_reason = "take_profit_reached"`.
    #[serde(default)]
    pub take_profit_pct: Option<Decimal>,
    #[serde(default)]
    pub trailing: Option<TrailingGridConfig>,
    /// Candle duration in seconds, used to annualize Sharpe/Sortino.
    #[serde(default = "default_bar_duration_secs")]
    pub bar_duration_secs: i64,
}

fn default_bar_duration_secs() -> i64 {
    3600
}

impl Default for GridBacktestConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            grid_spacing: GridSpacing::Arithmetic,
            num_levels: 10,
            amount_per_grid: dec!(100),
            profit_per_grid: dec!(0.005),
            atr_period: 14,
            atr_multiplier: dec!(2),
            auto_bounds: true,
            upper_price: None,
            lower_price: None,
            direction: DirectionBias::Neutral,
            initial_balance: dec!(10000),
            fees: FeeSchedule::zero(),
            slippage: Decimal::ZERO,
            stop_loss_pct: None,
            max_drawdown_pct: None,
            take_profit_pct: None,
            trailing: None,
            bar_duration_secs: default_bar_duration_secs(),
        }
    }
}

impl GridBacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestConfigError> {
        if self.num_levels < 2 {
            return Err(BacktestConfigError::TooFewLevels(self.num_levels));
        }
        if self.amount_per_grid <= Decimal::ZERO {
            return Err(BacktestConfigError::NonPositiveAmount);
        }
        if self.profit_per_grid <= Decimal::ZERO {
            return Err(BacktestConfigError::NonPositiveProfit);
        }
        if self.initial_balance <= Decimal::ZERO {
            return Err(BacktestConfigError::NonPositiveBalance);
        }
        if !self.auto_bounds {
            match (self.upper_price, self.lower_price) {
                (Some(u), Some(l)) if u > l => {}
                (Some(_), Some(_)) => return Err(BacktestConfigError::BoundsReversed),
                _ => return Err(BacktestConfigError::MissingExplicitBounds),
            }
        }
        Ok(())
    }

    /// Annualization factor for Sharpe/Sortino, derived from
    /// `bar_duration_secs` rather than a hardcoded constant. A standard
    /// hourly bar (3600s) yields 8,760; a daily bar (86400s) yields 365.
    pub fn periods_per_year(&self) -> f64 {
        if self.bar_duration_secs <= 0 {
            return 8760.0;
        }
        (365.0 * 24.0 * 3600.0) / self.bar_duration_secs as f64
    }

    /// Loads and validates a config from a TOML file.
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading backtest config file {}", path.display()))?;
        let config: GridBacktestConfig =
            toml::from_str(&raw).with_context(|| format!("parsing backtest config file {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid backtest config in {}: {e}", path.display()))?;
        Ok(config)
    }
}
