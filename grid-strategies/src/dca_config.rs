//! DCA deal/safety-order/signal configuration: the safety-order schedule
//! consumed by `DCAPositionManager`, and the confluence-scoring config
//! consumed by `DCASignalGenerator`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DCAConfigError {
    #[error("base_order_volume must be positive, got {0}")]
    NonPositiveBaseVolume(Decimal),
    #[error("max_safety_orders must be >= 0, got {0}")]
    InvalidMaxSafetyOrders(i64),
    #[error("so_step_pct must be in (0, 1), got {0}")]
    InvalidStepPct(Decimal),
    #[error("take_profit_pct must be positive, got {0}")]
    NonPositiveTakeProfit(Decimal),
}

/// `(base_price, step_pct, volume_multiplier, step_multiplier, n)` derivation
/// parameters for a DCA deal's safety-order ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DCAOrderConfig {
    pub base_order_volume: Decimal,
    pub max_safety_orders: i64,
    pub so_volume_multiplier: Decimal,
    pub so_step_pct: Decimal,
    pub so_step_multiplier: Decimal,
    pub take_profit_pct: Decimal,
    /// Decimal places safety-order prices/volumes are rounded to.
    #[serde(default = "default_precision")]
    pub precision: u32,
}

fn default_precision() -> u32 {
    8
}

impl DCAOrderConfig {
    pub fn validate(&self) -> Result<(), DCAConfigError> {
        if self.base_order_volume <= Decimal::ZERO {
            return Err(DCAConfigError::NonPositiveBaseVolume(self.base_order_volume));
        }
        if self.max_safety_orders < 0 {
            return Err(DCAConfigError::InvalidMaxSafetyOrders(self.max_safety_orders));
        }
        if self.so_step_pct <= Decimal::ZERO || self.so_step_pct >= Decimal::ONE {
            return Err(DCAConfigError::InvalidStepPct(self.so_step_pct));
        }
        if self.take_profit_pct <= Decimal::ZERO {
            return Err(DCAConfigError::NonPositiveTakeProfit(self.take_profit_pct));
        }
        Ok(())
    }

    /// Deterministic derivation of the safety-order ladder from
    /// `(base_price, step_pct, volume_multiplier, step_multiplier, n)`
    ///:
    ///
    /// `price[k] = price[k-1] * (1 - step_pct * step_multiplier^k)`
    /// `volume[k] = base_volume * volume_multiplier^k`
    pub fn safety_order_schedule(&self, base_price: Decimal) -> Vec<SafetyOrderLevel> {
        let mut schedule = Vec::with_capacity(self.max_safety_orders.max(0) as usize);
        let mut price = base_price;
        for k in 1..=self.max_safety_orders {
            let step_mult = pow_decimal(self.so_step_multiplier, k as u32);
            let vol_mult = pow_decimal(self.so_volume_multiplier, k as u32);
            price *= Decimal::ONE - self.so_step_pct * step_mult;
            let volume = (self.base_order_volume * vol_mult).round_dp(self.precision);
            schedule.push(SafetyOrderLevel {
                level: k,
                price: price.round_dp(self.precision),
                volume,
            });
        }
        schedule
    }
}

fn pow_decimal(base: Decimal, exp: u32) -> Decimal {
    let mut acc = Decimal::ONE;
    for _ in 0..exp {
        acc *= base;
    }
    acc
}

/// One level of a precomputed safety-order ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyOrderLevel {
    pub level: i64,
    pub price: Decimal,
    pub volume: Decimal,
}

/// One recognized confluence condition and its weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCondition {
    EmaCrossBullish,
    AdxStrength,
    RsiOversold,
    PriceNearSupport,
    BbLowerTouch,
    VolumeSpike,
}

/// Weighted-condition + timing-filter configuration for `DCASignalGenerator`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DCASignalConfig {
    pub weights: Vec<(SignalCondition, f64)>,
    pub min_confluence_score: f64,
    pub rsi_oversold_threshold: f64,
    pub adx_strength_min: f64,
    pub adx_strength_max: f64,
    pub support_band_pct: f64,
    pub volume_spike_multiplier: f64,
    pub ema_cross_lookback_bars: u32,
    pub cooldown_secs: f64,
    pub confirmation_bars: u32,
    pub max_data_age_secs: f64,
}

impl DCASignalConfig {
    pub fn weight_of(&self, cond: SignalCondition) -> f64 {
        self.weights
            .iter()
            .find(|(c, _)| std::mem::discriminant(c) == std::mem::discriminant(&cond))
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> DCAOrderConfig {
        DCAOrderConfig {
            base_order_volume: dec!(10),
            max_safety_orders: 3,
            so_volume_multiplier: dec!(1.5),
            so_step_pct: dec!(0.05),
            so_step_multiplier: dec!(1.0),
            take_profit_pct: dec!(0.02),
            precision: 2,
        }
    }

    // base_price=100 -> SO prices 95, 90.25, 85.74 (rounded);
    // volumes 15, 22.5, 33.75.
    #[test]
    fn safety_order_schedule_derives_expected_prices_and_volumes() {
        let schedule = config().safety_order_schedule(dec!(100));
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].price, dec!(95.00));
        assert_eq!(schedule[0].volume, dec!(15.00));
        assert_eq!(schedule[1].price, dec!(90.25));
        assert_eq!(schedule[1].volume, dec!(22.50));
        assert_eq!(schedule[2].price, dec!(85.74));
        assert_eq!(schedule[2].volume, dec!(33.75));
    }

    #[test]
    fn zero_safety_orders_yields_empty_schedule() {
        let mut c = config();
        c.max_safety_orders = 0;
        assert!(c.safety_order_schedule(dec!(100)).is_empty());
    }

    #[test]
    fn rejects_step_pct_out_of_range() {
        let mut c = config();
        c.so_step_pct = dec!(1.5);
        assert!(c.validate().is_err());
    }
}
