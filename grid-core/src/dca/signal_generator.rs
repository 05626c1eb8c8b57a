//! DCASignalGenerator (C7) — weighted confluence scoring over a market
//! indicator snapshot.
//!
//! Conditions are a data-driven weight map rather than a hardcoded
//! expression, so adding a new confluence condition doesn't require a new
//! match arm in the caller.

use chrono::{DateTime, Utc};
use grid_strategies::{DCASignalConfig, SignalCondition};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// A snapshot of indicators the signal generator scores against. `ema_fast`/
/// `ema_slow` carry short history so a bullish cross can be detected within
/// the configured lookback window.
#[derive(Debug, Clone)]
pub struct MarketIndicators {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub low: Decimal,
    pub ema_fast_history: Vec<f64>,
    pub ema_slow_history: Vec<f64>,
    pub adx: Option<f64>,
    pub rsi: Option<f64>,
    pub support: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub volume: f64,
    pub avg_volume: f64,
}

#[derive(Debug, Clone)]
pub struct SignalResult {
    pub should_open: bool,
    pub score: f64,
    pub condition_scores: Vec<(SignalCondition, f64)>,
    pub reasons: Vec<String>,
}

pub struct DCASignalGenerator {
    config: DCASignalConfig,
    last_signal_at: Option<DateTime<Utc>>,
    consecutive_pass_bars: u32,
}

impl DCASignalGenerator {
    pub fn new(config: DCASignalConfig) -> Self {
        Self {
            config,
            last_signal_at: None,
            consecutive_pass_bars: 0,
        }
    }

    fn score_condition(&self, cond: SignalCondition, ind: &MarketIndicators) -> f64 {
        match cond {
            SignalCondition::EmaCrossBullish => {
                let lookback = self.config.ema_cross_lookback_bars as usize;
                let fast = &ind.ema_fast_history;
                let slow = &ind.ema_slow_history;
                let n = fast.len().min(slow.len());
                if n < 2 {
                    return 0.0;
                }
                let window = lookback.min(n - 1).max(1);
                for i in (n - window)..n {
                    if fast[i - 1] <= slow[i - 1] && fast[i] > slow[i] {
                        return 1.0;
                    }
                }
                0.0
            }
            SignalCondition::AdxStrength => match ind.adx {
                Some(adx) => saturating_map(adx, self.config.adx_strength_min, self.config.adx_strength_max),
                None => 0.0,
            },
            SignalCondition::RsiOversold => match ind.rsi {
                Some(rsi) if rsi <= self.config.rsi_oversold_threshold => 1.0,
                _ => 0.0,
            },
            SignalCondition::PriceNearSupport => match ind.support {
                Some(support) if ind.price > Decimal::ZERO => {
                    let dist = ((ind.price - support) / ind.price).abs();
                    if dist.to_f64().unwrap_or(1.0) <= self.config.support_band_pct {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            },
            SignalCondition::BbLowerTouch => match ind.bb_lower {
                Some(bb_lower) if ind.low <= bb_lower => 1.0,
                _ => 0.0,
            },
            SignalCondition::VolumeSpike => {
                if ind.avg_volume > 0.0 && ind.volume >= self.config.volume_spike_multiplier * ind.avg_volume {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Evaluates `indicators` against the configured weighted conditions.
    /// Never triggers on stale data (`timestamp` older than
    /// `max_data_age_secs` relative to `now`), and enforces a cooldown
    /// since the last signal plus a confirmation-bar count.
    pub fn evaluate(&mut self, indicators: &MarketIndicators, now: DateTime<Utc>) -> SignalResult {
        let age_secs = (now - indicators.timestamp).num_milliseconds() as f64 / 1000.0;
        if age_secs > self.config.max_data_age_secs {
            return SignalResult {
                should_open: false,
                score: 0.0,
                condition_scores: vec![],
                reasons: vec!["stale indicator data".to_string()],
            };
        }

        let conditions = [
            SignalCondition::EmaCrossBullish,
            SignalCondition::AdxStrength,
            SignalCondition::RsiOversold,
            SignalCondition::PriceNearSupport,
            SignalCondition::BbLowerTouch,
            SignalCondition::VolumeSpike,
        ];
        let mut condition_scores = Vec::with_capacity(conditions.len());
        let mut score = 0.0;
        for cond in conditions {
            let s = self.score_condition(cond, indicators);
            score += self.config.weight_of(cond) * s;
            condition_scores.push((cond, s));
        }

        let mut reasons = Vec::new();
        let meets_score = score >= self.config.min_confluence_score;
        if !meets_score {
            reasons.push(format!("score {score:.3} below threshold {:.3}", self.config.min_confluence_score));
        }

        let cooldown_ok = match self.last_signal_at {
            Some(last) => (now - last).num_milliseconds() as f64 / 1000.0 >= self.config.cooldown_secs,
            None => true,
        };
        if !cooldown_ok {
            reasons.push("cooldown active since last signal".to_string());
        }

        if meets_score {
            self.consecutive_pass_bars += 1;
        } else {
            self.consecutive_pass_bars = 0;
        }
        let confirmed = self.consecutive_pass_bars >= self.config.confirmation_bars.max(1);
        if meets_score && !confirmed {
            reasons.push(format!(
                "awaiting confirmation ({}/{})",
                self.consecutive_pass_bars, self.config.confirmation_bars
            ));
        }

        let should_open = meets_score && cooldown_ok && confirmed;
        if should_open {
            self.last_signal_at = Some(now);
        }

        SignalResult {
            should_open,
            score,
            condition_scores,
            reasons,
        }
    }
}

fn saturating_map(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn config() -> DCASignalConfig {
        DCASignalConfig {
            weights: vec![
                (SignalCondition::EmaCrossBullish, 0.3),
                (SignalCondition::AdxStrength, 0.2),
                (SignalCondition::RsiOversold, 0.2),
                (SignalCondition::PriceNearSupport, 0.1),
                (SignalCondition::BbLowerTouch, 0.1),
                (SignalCondition::VolumeSpike, 0.1),
            ],
            min_confluence_score: 0.5,
            rsi_oversold_threshold: 30.0,
            adx_strength_min: 15.0,
            adx_strength_max: 40.0,
            support_band_pct: 0.01,
            volume_spike_multiplier: 1.5,
            ema_cross_lookback_bars: 3,
            cooldown_secs: 0.0,
            confirmation_bars: 1,
            max_data_age_secs: 60.0,
        }
    }

    fn indicators() -> MarketIndicators {
        MarketIndicators {
            timestamp: now(),
            price: dec!(100),
            low: dec!(99),
            ema_fast_history: vec![9.0, 9.5, 10.1],
            ema_slow_history: vec![10.0, 10.0, 10.0],
            adx: Some(30.0),
            rsi: Some(25.0),
            support: Some(dec!(99.5)),
            bb_lower: Some(dec!(99.2)),
            volume: 200.0,
            avg_volume: 100.0,
        }
    }

    #[test]
    fn high_confluence_opens_deal() {
        let mut gen = DCASignalGenerator::new(config());
        let result = gen.evaluate(&indicators(), now());
        assert!(result.should_open);
        assert!(result.score >= 0.5);
    }

    #[test]
    fn stale_data_never_triggers() {
        let mut gen = DCASignalGenerator::new(config());
        let stale = now() + chrono::Duration::seconds(120);
        let result = gen.evaluate(&indicators(), stale);
        assert!(!result.should_open);
        assert!(result.reasons.iter().any(|r| r.contains("stale")));
    }

    #[test]
    fn cooldown_blocks_immediate_retrigger() {
        let mut cfg = config();
        cfg.cooldown_secs = 300.0;
        let mut gen = DCASignalGenerator::new(cfg);
        let first = gen.evaluate(&indicators(), now());
        assert!(first.should_open);
        let second = gen.evaluate(&indicators(), now() + chrono::Duration::seconds(10));
        assert!(!second.should_open);
    }

    #[test]
    fn confirmation_bars_delay_trigger() {
        let mut cfg = config();
        cfg.confirmation_bars = 2;
        let mut gen = DCASignalGenerator::new(cfg);
        let first = gen.evaluate(&indicators(), now());
        assert!(!first.should_open);
        let second = gen.evaluate(&indicators(), now() + chrono::Duration::seconds(1));
        assert!(second.should_open);
    }
}
