//! CoinClusterizer — classifies a symbol into a volatility cluster from its
//! recent candle history, and maps that cluster onto the `ClusterPreset`
//! the optimizer's coarse phase draws from.

use crate::ohlcv::Candle;
use grid_core::grid::calculator::GridCalculator;
use grid_strategies::{ClusterPreset, CoinCluster};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinProfile {
    pub cluster: CoinCluster,
    pub atr_pct: f64,
    pub avg_daily_volume: f64,
    pub max_gap_pct: f64,
    pub volatility_score: f64,
}

pub struct CoinClusterizer;

impl CoinClusterizer {
    /// Classifies `candles` (assumed to belong to one symbol) into a
    /// `CoinProfile`. Requires at least 2 candles.
    pub fn classify(candles: &[Candle]) -> CoinProfile {
        let atr_pct = Self::atr_pct(candles);
        let avg_daily_volume = Self::avg_volume(candles);
        let max_gap_pct = Self::max_gap_pct(candles);
        let volatility_score = (atr_pct * 10.0).min(100.0) * 0.7 + (max_gap_pct * 5.0).min(100.0) * 0.3;
        CoinProfile {
            cluster: ClusterPreset::classify(atr_pct),
            atr_pct,
            avg_daily_volume,
            max_gap_pct,
            volatility_score: (volatility_score * 100.0).round() / 100.0,
        }
    }

    pub fn preset_for(profile: &CoinProfile) -> ClusterPreset {
        ClusterPreset::for_cluster(profile.cluster)
    }

    fn atr_pct(candles: &[Candle]) -> f64 {
        if candles.len() < 2 {
            return 0.0;
        }
        let period = 14.min(candles.len() - 1);
        let highs: Vec<Decimal> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = candles.iter().map(|c| c.low).collect();
        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let atr = GridCalculator::atr(&highs, &lows, &closes, period);
        let avg_close = closes.iter().sum::<Decimal>() / Decimal::from(closes.len() as u64);
        if avg_close.is_zero() {
            return 0.0;
        }
        (atr / avg_close * Decimal::from(100)).to_f64().unwrap_or(0.0)
    }

    fn avg_volume(candles: &[Candle]) -> f64 {
        if candles.is_empty() {
            return 0.0;
        }
        let avg_volume = candles.iter().map(|c| c.volume).sum::<Decimal>() / Decimal::from(candles.len() as u64);
        let avg_close = candles.iter().map(|c| c.close).sum::<Decimal>() / Decimal::from(candles.len() as u64);
        (avg_volume * avg_close).to_f64().unwrap_or(0.0)
    }

    fn max_gap_pct(candles: &[Candle]) -> f64 {
        if candles.len() < 2 {
            return 0.0;
        }
        candles
            .windows(2)
            .map(|w| {
                if w[0].close.is_zero() {
                    Decimal::ZERO
                } else {
                    ((w[1].close - w[0].close) / w[0].close * Decimal::from(100)).abs()
                }
            })
            .map(|d| d.to_f64().unwrap_or(0.0))
            .fold(0.0, f64::max)
    }
}
