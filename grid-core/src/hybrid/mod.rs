//! HybridCoordinator (C10) — stateless ADX-threshold routing between grid
//! and DCA strategies, with a tolerance band around the threshold that can
//! run both strategies at once. `BothActive` gets its own `TradingMode`
//! variant rather than reusing `GridOnly`, so callers never have to infer
//! "both" from a missing DCA-specific tag.

use grid_strategies::HybridConfig;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingMode {
    GridOnly,
    DcaActive,
    BothActive,
}

#[derive(Debug, Clone)]
pub struct CoordinatedDecision {
    pub mode: TradingMode,
    pub reason: String,
}

impl CoordinatedDecision {
    fn grid_only(reason: impl Into<String>) -> Self {
        Self {
            mode: TradingMode::GridOnly,
            reason: reason.into(),
        }
    }
}

/// Stateless; holds only the immutable routing config. Never touches grid
/// or DCA strategy state — callers translate the decision into whether to
/// drive `GridOrderManager`, `DCAPositionManager`, or both this tick.
pub struct HybridCoordinator {
    config: HybridConfig,
}

impl HybridCoordinator {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        adx: Option<f64>,
        _current_price: Option<Decimal>,
        _extra: Option<&str>,
    ) -> CoordinatedDecision {
        let Some(adx) = adx else {
            return CoordinatedDecision::grid_only("no ADX reading available");
        };

        let lower = self.config.adx_dca_threshold - self.config.adx_tolerance;
        let upper = self.config.adx_dca_threshold + self.config.adx_tolerance;

        if self.config.allow_both && adx >= lower && adx <= upper {
            return CoordinatedDecision {
                mode: TradingMode::BothActive,
                reason: format!(
                    "adx {adx} within tolerance band [{lower}, {upper}] of threshold {}",
                    self.config.adx_dca_threshold
                ),
            };
        }

        if adx > self.config.adx_dca_threshold {
            return CoordinatedDecision {
                mode: TradingMode::DcaActive,
                reason: format!("adx {adx} exceeds threshold {}", self.config.adx_dca_threshold),
            };
        }

        CoordinatedDecision::grid_only(format!(
            "adx {adx} at or below threshold {}",
            self.config.adx_dca_threshold
        ))
    }
}
