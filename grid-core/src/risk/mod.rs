//! RiskManager (C4) — balance/drawdown/trend-suitability guardrails shared
//! by every strategy engine.
//!
//! Halts are sticky: once tripped, a halt stays active until `resume` is
//! called explicitly, regardless of later balance improvement. No
//! short/long exposure model here — grid/DCA bots are spot, long-only.

use chrono::{DateTime, Utc};
use grid_strategies::RiskLimits;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskCheckResult {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl RiskCheckResult {
    fn ok() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSuitability {
    Safe,
    Pause,
    Deactivate,
}

pub struct RiskManager {
    limits: RiskLimits,
    initial_balance: Decimal,
    current_balance: Decimal,
    peak_balance: Decimal,
    daily_loss: Decimal,
    consecutive_losses: u32,
    is_halted: bool,
    halt_reason: Option<String>,
    last_update_day: Option<chrono::NaiveDate>,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self {
            limits,
            initial_balance: Decimal::ZERO,
            current_balance: Decimal::ZERO,
            peak_balance: Decimal::ZERO,
            daily_loss: Decimal::ZERO,
            consecutive_losses: 0,
            is_halted: false,
            halt_reason: None,
            last_update_day: None,
        }
    }

    pub fn initialize_balance(&mut self, balance: Decimal) {
        self.initial_balance = balance;
        self.current_balance = balance;
        self.peak_balance = balance;
    }

    pub fn is_halted(&self) -> bool {
        self.is_halted
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halt_reason.as_deref()
    }

    pub fn current_balance(&self) -> Decimal {
        self.current_balance
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    fn halt(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.is_halted {
            error!(reason = %reason, "risk manager halted");
        }
        self.is_halted = true;
        self.halt_reason = Some(reason);
    }

    /// Updates current balance, rolling daily loss across UTC day
    /// boundaries, then evaluates stop-loss and daily-loss limits.
    pub fn update_balance(&mut self, balance: Decimal, now: DateTime<Utc>) {
        let today = now.date_naive();
        if self.last_update_day != Some(today) {
            self.daily_loss = Decimal::ZERO;
            self.last_update_day = Some(today);
        }

        if balance < self.current_balance {
            self.daily_loss += self.current_balance - balance;
        }
        self.current_balance = balance;
        if balance > self.peak_balance {
            self.peak_balance = balance;
        }

        self.check_portfolio_stop_loss();
        self.check_daily_loss_limit();
    }

    pub fn check_portfolio_stop_loss(&mut self) {
        let Some(stop_loss_pct) = self.limits.stop_loss_pct else {
            return;
        };
        if self.initial_balance <= Decimal::ZERO {
            return;
        }
        let drawdown = (self.initial_balance - self.current_balance) / self.initial_balance;
        if drawdown >= stop_loss_pct {
            self.halt(format!("portfolio stop-loss breached: drawdown {drawdown} >= {stop_loss_pct}"));
        }
    }

    pub fn check_daily_loss_limit(&mut self) {
        let Some(max_daily_loss) = self.limits.max_daily_loss else {
            return;
        };
        if self.daily_loss >= max_daily_loss {
            self.halt(format!("daily loss limit breached: {} >= {max_daily_loss}", self.daily_loss));
        }
    }

    fn halted_check(&self) -> Option<RiskCheckResult> {
        if self.is_halted {
            Some(RiskCheckResult::deny(
                self.halt_reason.clone().unwrap_or_else(|| "trading halted".to_string()),
            ))
        } else {
            None
        }
    }

    pub fn check_order_size(&self, size: Decimal) -> RiskCheckResult {
        if let Some(r) = self.halted_check() {
            return r;
        }
        if size < self.limits.min_order_size {
            return RiskCheckResult::deny(format!("order size {size} below minimum {}", self.limits.min_order_size));
        }
        if size > self.limits.max_order_size {
            return RiskCheckResult::deny(format!("order size {size} exceeds maximum {}", self.limits.max_order_size));
        }
        RiskCheckResult::ok()
    }

    pub fn check_position_limit(&self, projected_position_value: Decimal) -> RiskCheckResult {
        if let Some(r) = self.halted_check() {
            return r;
        }
        if projected_position_value > self.limits.max_position_size {
            return RiskCheckResult::deny(format!(
                "projected position {projected_position_value} exceeds max {}",
                self.limits.max_position_size
            ));
        }
        RiskCheckResult::ok()
    }

    pub fn check_balance(&self, required: Decimal) -> RiskCheckResult {
        if let Some(r) = self.halted_check() {
            return r;
        }
        if required > self.current_balance {
            return RiskCheckResult::deny(format!(
                "insufficient balance: need {required}, have {}",
                self.current_balance
            ));
        }
        RiskCheckResult::ok()
    }

    pub fn check_trade(&self, size: Decimal, projected_position_value: Decimal, required_balance: Decimal) -> RiskCheckResult {
        if let Some(r) = self.halted_check() {
            return r;
        }
        let order_size = self.check_order_size(size);
        if !order_size.allowed {
            return order_size;
        }
        let position = self.check_position_limit(projected_position_value);
        if !position.allowed {
            return position;
        }
        self.check_balance(required_balance)
    }

    /// `price_move > 2*atr` or `adx > 25` deactivates the strategy; `price_move
    /// > atr` pauses it; otherwise it's safe to keep trading.
    pub fn check_trend_suitability(&self, atr: Decimal, price_move: Decimal, adx: Option<f64>) -> TrendSuitability {
        if price_move > atr * Decimal::from(2) || adx.is_some_and(|a| a > 25.0) {
            return TrendSuitability::Deactivate;
        }
        if price_move > atr {
            return TrendSuitability::Pause;
        }
        TrendSuitability::Safe
    }

    pub fn record_trade_result(&mut self, pnl: Decimal) {
        if pnl < Decimal::ZERO {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
    }

    /// Clears a halt only if one is active; halts are sticky otherwise —
    /// no new positions open regardless of later balance improvement,
    /// until `resume` is called explicitly.
    pub fn resume(&mut self) {
        if self.is_halted {
            warn!("risk manager resumed from halt");
            self.is_halted = false;
            self.halt_reason = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position_size: dec!(1000),
            max_order_size: dec!(500),
            min_order_size: dec!(10),
            stop_loss_pct: Some(dec!(0.2)),
            max_daily_loss: Some(dec!(100)),
            max_drawdown_pct: Some(dec!(0.25)),
        }
    }

    #[test]
    fn halts_on_portfolio_stop_loss() {
        let mut rm = RiskManager::new(limits());
        rm.initialize_balance(dec!(1000));
        rm.update_balance(dec!(750), now()); // 25% drawdown >= 20% stop-loss
        assert!(rm.is_halted());
    }

    #[test]
    fn halt_is_sticky_until_resume() {
        let mut rm = RiskManager::new(limits());
        rm.initialize_balance(dec!(1000));
        rm.update_balance(dec!(750), now());
        assert!(rm.is_halted());
        rm.update_balance(dec!(1200), now()); // balance recovers
        assert!(rm.is_halted(), "halt must remain sticky without explicit resume");
        rm.resume();
        assert!(!rm.is_halted());
    }

    #[test]
    fn halted_manager_rejects_every_check() {
        let mut rm = RiskManager::new(limits());
        rm.initialize_balance(dec!(1000));
        rm.update_balance(dec!(700), now());
        assert!(!rm.check_order_size(dec!(50)).allowed);
        assert!(!rm.check_position_limit(dec!(50)).allowed);
        assert!(!rm.check_balance(dec!(10)).allowed);
    }

    #[test]
    fn daily_loss_limit_halts() {
        let mut rm = RiskManager::new(limits());
        rm.initialize_balance(dec!(1000));
        rm.update_balance(dec!(880), now()); // daily loss 120 >= 100
        assert!(rm.is_halted());
    }

    #[test]
    fn trend_suitability_escalates_with_move_size() {
        let rm = RiskManager::new(limits());
        assert_eq!(rm.check_trend_suitability(dec!(10), dec!(5), None), TrendSuitability::Safe);
        assert_eq!(rm.check_trend_suitability(dec!(10), dec!(15), None), TrendSuitability::Pause);
        assert_eq!(rm.check_trend_suitability(dec!(10), dec!(25), None), TrendSuitability::Deactivate);
        assert_eq!(rm.check_trend_suitability(dec!(10), dec!(5), Some(30.0)), TrendSuitability::Deactivate);
    }

    #[test]
    fn record_trade_result_tracks_consecutive_losses() {
        let mut rm = RiskManager::new(limits());
        rm.record_trade_result(dec!(-5));
        rm.record_trade_result(dec!(-3));
        assert_eq!(rm.consecutive_losses(), 2);
        rm.record_trade_result(dec!(2));
        assert_eq!(rm.consecutive_losses(), 0);
    }
}
