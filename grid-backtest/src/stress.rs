//! Stress-testing over a symbol's most volatile sub-windows: runs the
//! single-run simulator and optimizer against each selected window to check
//! how a winning configuration holds up outside its training range.

use crate::config::GridBacktestConfig;
use crate::ohlcv::Candle;
use crate::result::BacktestResult;
use crate::simulator::{BacktestError, BacktestSimulator};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub volatility_score: f64,
    pub result: BacktestResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestReport {
    pub windows: Vec<StressWindow>,
    pub worst_drawdown_pct: Decimal,
    pub worst_window_index: Option<usize>,
}

impl StressTestReport {
    pub fn all_profitable(&self) -> bool {
        self.windows.iter().all(|w| w.result.is_profitable())
    }
}

fn window_volatility(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let high = candles.iter().map(|c| c.high).fold(Decimal::MIN, Decimal::max);
    let low = candles.iter().map(|c| c.low).fold(Decimal::MAX, Decimal::min);
    let mean_close = candles.iter().map(|c| c.close).sum::<Decimal>() / Decimal::from(candles.len() as u64);
    if mean_close.is_zero() {
        return 0.0;
    }
    ((high - low) / mean_close).to_f64().unwrap_or(0.0)
}

/// Greedily selects up to `num_periods` non-overlapping `window_len`-candle
/// windows ranked by volatility, highest first.
fn select_stress_windows(candles: &[Candle], window_len: usize, num_periods: usize) -> Vec<(usize, usize, f64)> {
    if candles.len() < window_len || window_len == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(usize, usize, f64)> = candles
        .windows(window_len)
        .enumerate()
        .map(|(start, w)| (start, start + window_len, window_volatility(w)))
        .collect();
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected: Vec<(usize, usize, f64)> = Vec::new();
    for candidate in scored {
        if selected.len() >= num_periods {
            break;
        }
        let overlaps = selected.iter().any(|(s, e, _)| candidate.0 < *e && *s < candidate.1);
        if !overlaps {
            selected.push(candidate);
        }
    }
    selected.sort_by_key(|(start, _, _)| *start);
    selected
}

/// Runs `config` against the `num_periods` most volatile non-overlapping
/// `window_len`-candle windows found in `candles`.
pub async fn run_stress_tests(
    config: &GridBacktestConfig,
    candles: &[Candle],
    window_len: usize,
    num_periods: usize,
) -> Result<StressTestReport, BacktestError> {
    let picks = select_stress_windows(candles, window_len, num_periods);
    info!(windows = picks.len(), window_len, "running stress tests over volatile sub-windows");

    let mut windows = Vec::new();
    let mut worst_drawdown = Decimal::ZERO;
    let mut worst_index = None;

    for (start, end, score) in picks {
        let slice = &candles[start..end];
        let result = BacktestSimulator::run(config, slice).await?;
        if result.max_drawdown_pct > worst_drawdown {
            worst_drawdown = result.max_drawdown_pct;
            worst_index = Some(windows.len());
        }
        windows.push(StressWindow {
            start_index: start,
            end_index: end,
            volatility_score: score,
            result,
        });
    }

    Ok(StressTestReport {
        windows,
        worst_drawdown_pct: worst_drawdown,
        worst_window_index: worst_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(hour: u32, close: Decimal) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour % 24, 0, 0).unwrap() + chrono::Duration::days((hour / 24) as i64),
            open: close,
            high: close * dec!(1.02),
            low: close * dec!(0.98),
            close,
            volume: dec!(100),
        }
    }

    #[test]
    fn select_stress_windows_avoids_overlap() {
        let candles: Vec<Candle> = (0..50).map(|h| candle(h, dec!(100) + Decimal::from(h % 10))).collect();
        let picks = select_stress_windows(&candles, 5, 3);
        for i in 0..picks.len() {
            for j in (i + 1)..picks.len() {
                let (s1, e1, _) = picks[i];
                let (s2, e2, _) = picks[j];
                assert!(s1 >= e2 || s2 >= e1, "windows must not overlap");
            }
        }
    }

    #[test]
    fn select_stress_windows_picks_highest_volatility_first() {
        let mut candles: Vec<Candle> = (0..30).map(|h| candle(h, dec!(100))).collect();
        // inject one violently volatile window.
        for i in 10..15 {
            candles[i].high = dec!(200);
            candles[i].low = dec!(50);
        }
        let picks = select_stress_windows(&candles, 5, 1);
        assert_eq!(picks.len(), 1);
        assert!(picks[0].0 <= 10 && picks[0].1 >= 15 || (picks[0].0..picks[0].1).contains(&12));
    }

    #[tokio::test]
    async fn run_stress_tests_produces_a_report_per_window() {
        let candles: Vec<Candle> = (0..60).map(|h| candle(h, dec!(100) + Decimal::from((h % 7) as i64))).collect();
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            ..GridBacktestConfig::default()
        };
        let report = run_stress_tests(&config, &candles, 20, 2).await.unwrap();
        assert!(!report.windows.is_empty());
        assert!(report.windows.len() <= 2);
    }
}
