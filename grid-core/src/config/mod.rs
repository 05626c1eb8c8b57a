//! Runtime configuration.
//!
//! Per-bot configuration is a human-editable, hierarchical TOML document
//! (YAML is reserved for the optimizer's preset *export*). `InvalidConfig`
//! failures are fatal to the caller at load time; the kernel never
//! attempts to repair an invalid configuration itself.

pub mod types;

pub use types::{BotConfig, LogFormat, LoggingConfig, StrategyKind};

use anyhow::{Context, Result};
use std::path::Path;

impl BotConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        let config: BotConfig = toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid config in {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_grid_strategy_without_grid_section() {
        let config = BotConfig {
            symbol: "BTC/USDT".into(),
            strategy: StrategyKind::Grid,
            grid: None,
            dca: None,
            dca_signal: None,
            hybrid: None,
            risk: grid_strategies::RiskLimits {
                max_position_size: rust_decimal_macros::dec!(1000),
                max_order_size: rust_decimal_macros::dec!(100),
                min_order_size: rust_decimal_macros::dec!(10),
                stop_loss_pct: None,
                max_daily_loss: None,
                max_drawdown_pct: None,
            },
            dry_run: true,
            leverage: 1,
            logging: LoggingConfig::default(),
        };
        assert!(config.validate().is_err());
    }
}
