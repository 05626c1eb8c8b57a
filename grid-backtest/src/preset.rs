//! YAML preset export for a winning optimizer trial. Decimal numbers are
//! serialized as strings to preserve precision across the YAML round-trip.

use crate::config::GridBacktestConfig;
use crate::optimizer::Trial;
use crate::result::BacktestResult;
use anyhow::{Context, Result};
use grid_strategies::VolatilityMode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetRisk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_stop_loss_pct: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_drawdown_pct: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetBacktestMetrics {
    pub total_return_pct: String,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: String,
    pub completed_cycles: u64,
    pub profit_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPreset {
    pub symbol: String,
    pub volatility_mode: VolatilityMode,
    pub grid_spacing: grid_strategies::GridSpacing,
    pub num_levels: u32,
    pub amount_per_grid: String,
    pub profit_per_grid: String,
    pub atr_multiplier: String,
    pub atr_period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower_price: Option<String>,
    pub risk: PresetRisk,
    #[serde(rename = "_backtest_metrics")]
    pub backtest_metrics: PresetBacktestMetrics,
}

fn decimal_string(d: Decimal) -> String {
    d.to_string()
}

/// Builds the YAML-serializable preset for a winning `trial`, layered onto
/// the base config it was searched from.
pub fn build_preset(base_config: &GridBacktestConfig, trial: &Trial, result: &BacktestResult) -> GridPreset {
    GridPreset {
        symbol: base_config.symbol.clone(),
        volatility_mode: VolatilityMode::Custom,
        grid_spacing: trial.grid_spacing,
        num_levels: trial.num_levels,
        amount_per_grid: decimal_string(base_config.amount_per_grid),
        profit_per_grid: decimal_string(trial.profit_per_grid),
        atr_multiplier: decimal_string(trial.atr_multiplier),
        atr_period: base_config.atr_period,
        upper_price: base_config.upper_price.map(decimal_string),
        lower_price: base_config.lower_price.map(decimal_string),
        risk: PresetRisk {
            grid_stop_loss_pct: base_config.stop_loss_pct.map(decimal_string),
            max_drawdown_pct: base_config.max_drawdown_pct.map(decimal_string),
        },
        backtest_metrics: PresetBacktestMetrics {
            total_return_pct: decimal_string(result.total_return_pct),
            sharpe_ratio: result.sharpe_ratio,
            max_drawdown_pct: decimal_string(result.max_drawdown_pct),
            completed_cycles: result.completed_cycles,
            profit_factor: result.profit_factor,
        },
    }
}

pub fn to_yaml(preset: &GridPreset) -> Result<String> {
    serde_yaml::to_string(preset).context("serializing grid preset to YAML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_strategies::GridSpacing;
    use rust_decimal_macros::dec;

    fn sample_trial() -> Trial {
        Trial {
            trial_id: 1,
            num_levels: 12,
            profit_per_grid: dec!(0.006),
            grid_spacing: GridSpacing::Geometric,
            atr_multiplier: dec!(2.0),
            config_hash: "abc123".to_string(),
            objective_value: 4.2,
            result: None,
            failed: false,
        }
    }

    fn sample_result() -> BacktestResult {
        BacktestResult {
            symbol: "BTC/USDT".to_string(),
            total_return_pct: dec!(12.5),
            total_pnl: dec!(1250),
            final_equity: dec!(11250),
            max_drawdown_pct: dec!(3.1),
            total_trades: 40,
            win_rate: dec!(0.6),
            completed_cycles: 18,
            grid_fill_rate: dec!(0.8),
            sharpe_ratio: 1.8,
            sortino_ratio: 2.3,
            calmar_ratio: 4.0,
            profit_factor: 2.1,
            capital_efficiency: dec!(0.4),
            total_fees: dec!(12),
            equity_curve: Vec::new(),
            trade_history: Vec::new(),
            stopped_by_risk: false,
            stop_reason: None,
            duration_seconds: 3600 * 24,
            price_left_grid_count: 0,
            max_one_sided_exposure: dec!(0.3),
            avg_profit_per_cycle: dec!(69.4),
        }
    }

    #[test]
    fn build_preset_carries_decimals_as_strings() {
        let base = GridBacktestConfig {
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            ..GridBacktestConfig::default()
        };
        let preset = build_preset(&base, &sample_trial(), &sample_result());
        assert_eq!(preset.profit_per_grid, "0.006");
        assert_eq!(preset.upper_price.as_deref(), Some("110"));
        assert_eq!(preset.backtest_metrics.total_return_pct, "12.5");
    }

    #[test]
    fn to_yaml_round_trips_through_serde_yaml() {
        let base = GridBacktestConfig::default();
        let preset = build_preset(&base, &sample_trial(), &sample_result());
        let yaml = to_yaml(&preset).unwrap();
        let parsed: GridPreset = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.num_levels, preset.num_levels);
        assert_eq!(parsed.amount_per_grid, preset.amount_per_grid);
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let base = GridBacktestConfig {
            stop_loss_pct: None,
            max_drawdown_pct: None,
            upper_price: None,
            lower_price: None,
            auto_bounds: true,
            ..GridBacktestConfig::default()
        };
        let preset = build_preset(&base, &sample_trial(), &sample_result());
        let yaml = to_yaml(&preset).unwrap();
        assert!(!yaml.contains("upper_price"));
        assert!(!yaml.contains("grid_stop_loss_pct"));
    }
}
