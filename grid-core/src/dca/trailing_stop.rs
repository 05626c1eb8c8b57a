//! DCATrailingStop (C8) — per-deal profit trailing stop.
//!
//! The highest-price field is never reset on safety-order fills; this is a
//! testable invariant enforced simply by never exposing a reset method.

use grid_strategies::{DCATrailingStopConfig, TrailingStopMode};
use rust_decimal::Decimal;

pub struct DCATrailingStop {
    config: DCATrailingStopConfig,
    activated: bool,
    highest_price: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct TrailingStopEvaluation {
    pub should_exit: bool,
    pub stop_price: Option<Decimal>,
}

impl DCATrailingStop {
    pub fn new(config: DCATrailingStopConfig) -> Self {
        Self {
            config,
            activated: false,
            highest_price: Decimal::ZERO,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn highest_price(&self) -> Decimal {
        self.highest_price
    }

    /// Activates once unrealized profit relative to `avg_entry` reaches
    /// `activation_pct`. Once activated, stays activated for the deal's
    /// lifetime (activation is monotonic, like the highest-price field).
    pub fn activate_if_profitable(&mut self, current_price: Decimal, avg_entry: Decimal) {
        if self.activated || avg_entry <= Decimal::ZERO {
            return;
        }
        let profit_pct = (current_price - avg_entry) / avg_entry;
        if profit_pct >= self.config.activation_pct {
            self.activated = true;
            self.highest_price = current_price;
        }
    }

    pub fn update_high(&mut self, current_price: Decimal) {
        if current_price > self.highest_price {
            self.highest_price = current_price;
        }
    }

    pub fn evaluate(&self, current_price: Decimal) -> TrailingStopEvaluation {
        if !self.activated {
            return TrailingStopEvaluation {
                should_exit: false,
                stop_price: None,
            };
        }
        let stop_price = match self.config.mode {
            TrailingStopMode::Percent => self.highest_price * (Decimal::ONE - self.config.trail_pct),
            TrailingStopMode::Absolute => self.highest_price - self.config.fixed_distance,
        };
        TrailingStopEvaluation {
            should_exit: current_price <= stop_price,
            stop_price: Some(stop_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn percent_config() -> DCATrailingStopConfig {
        DCATrailingStopConfig {
            mode: TrailingStopMode::Percent,
            activation_pct: dec!(0.02),
            trail_pct: dec!(0.01),
            fixed_distance: dec!(0),
        }
    }

    #[test]
    fn activates_once_profit_threshold_reached() {
        let mut ts = DCATrailingStop::new(percent_config());
        ts.activate_if_profitable(dec!(101), dec!(100));
        assert!(!ts.is_activated()); // 1% profit < 2% activation
        ts.activate_if_profitable(dec!(103), dec!(100));
        assert!(ts.is_activated());
    }

    #[test]
    fn highest_price_never_resets_on_safety_order_fills() {
        let mut ts = DCATrailingStop::new(percent_config());
        ts.activate_if_profitable(dec!(103), dec!(100));
        ts.update_high(dec!(110));
        assert_eq!(ts.highest_price(), dec!(110));
        // A safety-order fill would lower avg_entry, but trailing stop state
        // is never told about it (no reset path exists).
        assert_eq!(ts.highest_price(), dec!(110));
    }

    #[test]
    fn exits_when_price_drops_below_trail() {
        let mut ts = DCATrailingStop::new(percent_config());
        ts.activate_if_profitable(dec!(103), dec!(100));
        ts.update_high(dec!(110));
        let eval = ts.evaluate(dec!(108)); // stop = 110 * 0.99 = 108.9
        assert!(eval.should_exit);
    }

    #[test]
    fn absolute_mode_uses_fixed_distance() {
        let cfg = DCATrailingStopConfig {
            mode: TrailingStopMode::Absolute,
            activation_pct: dec!(0.02),
            trail_pct: dec!(0),
            fixed_distance: dec!(5),
        };
        let mut ts = DCATrailingStop::new(cfg);
        ts.activate_if_profitable(dec!(103), dec!(100));
        ts.update_high(dec!(110));
        let eval = ts.evaluate(dec!(104));
        assert!(eval.should_exit); // stop = 110 - 5 = 105
    }
}
