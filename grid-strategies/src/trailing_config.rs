//! Config types for the per-deal profit trailing stop (`DCATrailingStop`)
//! and the whole-grid recentering manager (`TrailingGridManager`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrailingConfigError {
    #[error("activation_pct must be > 0")]
    NonPositiveActivation,
    #[error("trail_pct must be in (0, 1)")]
    InvalidTrailPct,
    #[error("shift_threshold must be > 0")]
    NonPositiveThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingStopMode {
    Percent,
    Absolute,
}

/// Config for the per-deal profit trailing stop (C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DCATrailingStopConfig {
    pub mode: TrailingStopMode,
    pub activation_pct: Decimal,
    pub trail_pct: Decimal,
    pub fixed_distance: Decimal,
}

impl DCATrailingStopConfig {
    pub fn validate(&self) -> Result<(), TrailingConfigError> {
        if self.activation_pct <= Decimal::ZERO {
            return Err(TrailingConfigError::NonPositiveActivation);
        }
        if self.mode == TrailingStopMode::Percent
            && (self.trail_pct <= Decimal::ZERO || self.trail_pct >= Decimal::ONE)
        {
            return Err(TrailingConfigError::InvalidTrailPct);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecenterMode {
    Fixed,
    Atr,
}

/// Config for the whole-grid trailing/recentering manager (C9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingGridConfig {
    pub shift_threshold: Decimal,
    pub cooldown_candles: u32,
    pub recenter_mode: RecenterMode,
}

impl TrailingGridConfig {
    pub fn validate(&self) -> Result<(), TrailingConfigError> {
        if self.shift_threshold <= Decimal::ZERO {
            return Err(TrailingConfigError::NonPositiveThreshold);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_trail_pct_out_of_range() {
        let cfg = DCATrailingStopConfig {
            mode: TrailingStopMode::Percent,
            activation_pct: dec!(0.01),
            trail_pct: dec!(1.5),
            fixed_distance: dec!(0),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn absolute_mode_ignores_trail_pct_bounds() {
        let cfg = DCATrailingStopConfig {
            mode: TrailingStopMode::Absolute,
            activation_pct: dec!(0.01),
            trail_pct: dec!(0),
            fixed_distance: dec!(50),
        };
        assert!(cfg.validate().is_ok());
    }
}
