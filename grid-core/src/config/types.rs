//! Per-bot runtime configuration.

use grid_strategies::{DCAOrderConfig, DCASignalConfig, GridConfig, HybridConfig, RiskLimits};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Grid,
    Dca,
    Hybrid,
    TrendFollower,
}

/// Top-level bot configuration, loaded from a TOML file.
/// `InvalidConfig` failures from [`BotConfig::validate`] are fatal to the
/// caller — this kernel never attempts to repair a bad config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    pub strategy: StrategyKind,
    #[serde(default)]
    pub grid: Option<GridConfig>,
    #[serde(default)]
    pub dca: Option<DCAOrderConfig>,
    #[serde(default)]
    pub dca_signal: Option<DCASignalConfig>,
    #[serde(default)]
    pub hybrid: Option<HybridConfig>,
    pub risk: RiskLimits,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_leverage() -> u32 {
    1
}

impl BotConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self.strategy {
            StrategyKind::Grid => {
                if self.grid.is_none() {
                    return Err("strategy = grid requires a [grid] section".into());
                }
            }
            StrategyKind::Dca => {
                if self.dca.is_none() {
                    return Err("strategy = dca requires a [dca] section".into());
                }
            }
            StrategyKind::Hybrid => {
                if self.grid.is_none() || self.dca.is_none() || self.hybrid.is_none() {
                    return Err("strategy = hybrid requires [grid], [dca], and [hybrid] sections".into());
                }
            }
            StrategyKind::TrendFollower => {}
        }
        if let Some(grid) = &self.grid {
            grid.validate().map_err(|e| e.to_string())?;
        }
        if let Some(dca) = &self.dca {
            dca.validate().map_err(|e| e.to_string())?;
        }
        if self.leverage == 0 {
            return Err("leverage must be >= 1".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability config, loaded the same way as `BotConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: Option<LogFormat>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}
