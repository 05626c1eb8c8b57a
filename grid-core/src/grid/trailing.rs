//! TrailingGridManager (C9) — shifts grid bounds when price escapes them,
//! subject to a cooldown.

use super::calculator::GridCalculator;
use grid_strategies::{GridConfig, GridSpacing, RecenterMode, TrailingGridConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct ShiftEvent {
    pub at_price: Decimal,
    pub new_upper: Decimal,
    pub new_lower: Decimal,
}

pub struct TrailingGridManager {
    config: TrailingGridConfig,
    cooldown_remaining: u32,
    shift_count: u32,
    shift_history: Vec<ShiftEvent>,
}

impl TrailingGridManager {
    pub fn new(config: TrailingGridConfig) -> Self {
        Self {
            config,
            cooldown_remaining: 0,
            shift_count: 0,
            shift_history: Vec::new(),
        }
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn shift_count(&self) -> u32 {
        self.shift_count
    }

    pub fn shift_history(&self) -> &[ShiftEvent] {
        &self.shift_history
    }

    /// Advance by one candle; decrements the cooldown towards zero.
    pub fn tick(&mut self) {
        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
        }
    }

    /// Returns a re-centered `GridConfig` iff the cooldown has elapsed and
    /// price has escaped the current bounds by more than
    /// `shift_threshold * spread`. `recent_bars` is `(highs, lows, closes)`,
    /// required only when `recenter_mode == Atr`.
    pub fn check_and_shift(
        &mut self,
        current_price: Decimal,
        current_upper: Decimal,
        current_lower: Decimal,
        grid_config: &GridConfig,
        recent_bars: Option<(&[Decimal], &[Decimal], &[Decimal])>,
    ) -> Option<GridConfig> {
        if self.cooldown_remaining > 0 {
            return None;
        }
        let spread = current_upper - current_lower;
        let band = self.config.shift_threshold * spread;
        let escaped_above = current_price > current_upper + band;
        let escaped_below = current_price < current_lower - band;
        if !escaped_above && !escaped_below {
            return None;
        }

        let (new_upper, new_lower) = match self.config.recenter_mode {
            RecenterMode::Fixed => {
                let half = spread / dec!(2);
                (current_price + half, current_price - half)
            }
            RecenterMode::Atr => {
                let (highs, lows, closes) = recent_bars.unwrap_or((&[], &[], &[]));
                let atr = GridCalculator::atr(highs, lows, closes, grid_config.atr_period as usize);
                GridCalculator::adjust_bounds_by_atr(current_price, atr, grid_config.atr_multiplier)
            }
        };
        let eps = dec!(0.00000001);
        let new_lower = new_lower.max(eps);

        self.cooldown_remaining = self.config.cooldown_candles;
        self.shift_count += 1;
        self.shift_history.push(ShiftEvent {
            at_price: current_price,
            new_upper,
            new_lower,
        });
        info!(shift_count = self.shift_count, price = %current_price, "grid shifted");

        let mut next = grid_config.clone();
        next.upper_price = Some(new_upper);
        next.lower_price = Some(new_lower);
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> GridConfig {
        GridConfig {
            symbol: "BTC/USDT".into(),
            volatility_mode: grid_strategies::VolatilityMode::Medium,
            grid_spacing: GridSpacing::Arithmetic,
            num_levels: 10,
            amount_per_grid: dec!(100),
            profit_per_grid: dec!(0.005),
            atr_multiplier: dec!(2),
            atr_period: 14,
            upper_price: Some(dec!(46000)),
            lower_price: Some(dec!(44000)),
            direction: Default::default(),
        }
    }

    fn trailing_config() -> TrailingGridConfig {
        TrailingGridConfig {
            shift_threshold: dec!(0.02),
            cooldown_candles: 3,
            recenter_mode: RecenterMode::Fixed,
        }
    }

    #[test]
    fn shifts_when_price_escapes_beyond_threshold_band() {
        let mut mgr = TrailingGridManager::new(trailing_config());
        let cfg = base_config();
        let shifted = mgr.check_and_shift(dec!(47000), dec!(46000), dec!(44000), &cfg, None);
        assert!(shifted.is_some());
        assert_eq!(mgr.shift_count(), 1);
        assert_eq!(mgr.cooldown_remaining(), 3);
    }

    #[test]
    fn does_not_shift_during_cooldown() {
        let mut mgr = TrailingGridManager::new(trailing_config());
        let cfg = base_config();
        mgr.check_and_shift(dec!(47000), dec!(46000), dec!(44000), &cfg, None);
        let second = mgr.check_and_shift(dec!(49000), dec!(46000), dec!(44000), &cfg, None);
        assert!(second.is_none());
    }

    #[test]
    fn escaping_bounds_twice_after_cooldown_yields_two_shifts() {
        // bounds 44000/46000, threshold 0.02, cooldown 3.
        // Candle at 47000 triggers the first shift; three candles around
        // 47000 stay in cooldown; a candle at 49000 escapes the new bounds
        // once cooldown has elapsed, triggering the second shift.
        let mut mgr = TrailingGridManager::new(trailing_config());
        let cfg = base_config();
        let shifted1 = mgr
            .check_and_shift(dec!(47000), dec!(46000), dec!(44000), &cfg, None)
            .unwrap();
        let (mut upper, mut lower) = (shifted1.upper_price.unwrap(), shifted1.lower_price.unwrap());

        for _ in 0..3 {
            mgr.tick();
            let r = mgr.check_and_shift(dec!(47000), upper, lower, &cfg, None);
            assert!(r.is_none());
        }

        let shifted2 = mgr.check_and_shift(dec!(49000), upper, lower, &cfg, None);
        assert!(shifted2.is_some());
        assert_eq!(mgr.shift_count(), 2);
        let s2 = shifted2.unwrap();
        upper = s2.upper_price.unwrap();
        lower = s2.lower_price.unwrap();
        assert!(dec!(49000) > lower && dec!(49000) < upper);
    }

    #[test]
    fn lower_bound_is_clamped_to_epsilon() {
        let mut mgr = TrailingGridManager::new(TrailingGridConfig {
            shift_threshold: dec!(0.01),
            cooldown_candles: 0,
            recenter_mode: RecenterMode::Fixed,
        });
        let cfg = base_config();
        let shifted = mgr
            .check_and_shift(dec!(0.0000001), dec!(1), dec!(0.5), &cfg, None)
            .unwrap();
        assert!(shifted.lower_price.unwrap() > Decimal::ZERO);
    }
}
