//! Grid engine configuration: level spacing, bounds, and direction bias
//! consumed by `GridCalculator` and `GridOrderManager`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Level-spacing rule for a grid's price ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpacing {
    Arithmetic,
    Geometric,
}

/// Recognized volatility presets for a bot's grid bounds.
/// `Custom` defers to explicit `upper_price`/`lower_price` in `GridConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityMode {
    Low,
    Medium,
    High,
    Custom,
}

/// Directional bias applied to initial grid bounds at construction:
/// LONG shifts down 20% of spread, SHORT shifts up 20%, NEUTRAL leaves
/// centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DirectionBias {
    #[default]
    Neutral,
    Long,
    Short,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridConfigError {
    #[error("num_levels must be >= 2, got {0}")]
    TooFewLevels(u32),
    #[error("amount_per_grid must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("profit_per_grid must be positive, got {0}")]
    NonPositiveProfit(Decimal),
    #[error("upper_price ({upper}) must be greater than lower_price ({lower})")]
    BoundsReversed { upper: Decimal, lower: Decimal },
    #[error("atr_period must be >= 1, got {0}")]
    InvalidAtrPeriod(u32),
}

/// Full grid engine configuration, as carried in the per-bot config file
/// and consumed by `GridCalculator`/`GridOrderManager`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub symbol: String,
    pub volatility_mode: VolatilityMode,
    pub grid_spacing: GridSpacing,
    pub num_levels: u32,
    pub amount_per_grid: Decimal,
    pub profit_per_grid: Decimal,
    pub atr_multiplier: Decimal,
    pub atr_period: u32,
    #[serde(default)]
    pub upper_price: Option<Decimal>,
    #[serde(default)]
    pub lower_price: Option<Decimal>,
    #[serde(default)]
    pub direction: DirectionBias,
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), GridConfigError> {
        if self.num_levels < 2 {
            return Err(GridConfigError::TooFewLevels(self.num_levels));
        }
        if self.amount_per_grid <= Decimal::ZERO {
            return Err(GridConfigError::NonPositiveAmount(self.amount_per_grid));
        }
        if self.profit_per_grid <= Decimal::ZERO {
            return Err(GridConfigError::NonPositiveProfit(self.profit_per_grid));
        }
        if self.atr_period < 1 {
            return Err(GridConfigError::InvalidAtrPeriod(self.atr_period));
        }
        if let (Some(u), Some(l)) = (self.upper_price, self.lower_price) {
            if u <= l {
                return Err(GridConfigError::BoundsReversed { upper: u, lower: l });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base() -> GridConfig {
        GridConfig {
            symbol: "BTC/USDT".into(),
            volatility_mode: VolatilityMode::Medium,
            grid_spacing: GridSpacing::Arithmetic,
            num_levels: 10,
            amount_per_grid: dec!(100),
            profit_per_grid: dec!(0.005),
            atr_multiplier: dec!(2),
            atr_period: 14,
            upper_price: Some(dec!(46000)),
            lower_price: Some(dec!(44000)),
            direction: DirectionBias::Neutral,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_too_few_levels() {
        let mut c = base();
        c.num_levels = 1;
        assert_eq!(c.validate(), Err(GridConfigError::TooFewLevels(1)));
    }

    #[test]
    fn rejects_reversed_bounds() {
        let mut c = base();
        c.upper_price = Some(dec!(100));
        c.lower_price = Some(dec!(200));
        assert!(c.validate().is_err());
    }

    #[test]
    fn yaml_round_trip_preserves_equality() {
        let c = base();
        let yaml = serde_yaml::to_string(&c).unwrap();
        let back: GridConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.num_levels, c.num_levels);
        assert_eq!(back.amount_per_grid, c.amount_per_grid);
        assert_eq!(back.upper_price, c.upper_price);
    }
}
