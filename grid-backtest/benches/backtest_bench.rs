//! Backtest performance benchmarks.
//!
//! Target: a full multi-year hourly-candle run completes in well under a
//! second, since the optimizer drives thousands of these per search.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_backtest::ohlcv::Candle;
use grid_backtest::{BacktestSimulator, GridBacktestConfig};
use rust_decimal_macros::dec;

fn oscillating_candles(n: usize) -> Vec<Candle> {
    (0..n as u32)
        .map(|h| {
            let (low, high) = if h % 2 == 0 { (dec!(85), dec!(100)) } else { (dec!(100), dec!(115)) };
            Candle {
                timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h as i64),
                open: dec!(100),
                high,
                low,
                close: dec!(100),
                volume: dec!(10),
            }
        })
        .collect()
}

fn bench_single_run(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("backtest_single_run");

    for n in [500usize, 2000, 8760].iter() {
        let candles = oscillating_candles(*n);
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(120)),
            lower_price: Some(dec!(80)),
            num_levels: 10,
            ..GridBacktestConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(BacktestSimulator::run(black_box(&config), black_box(&candles)).await.unwrap());
                });
            });
        });
    }

    group.finish();
}

fn bench_atr_bounds_initialization(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("backtest_auto_bounds");

    let candles = oscillating_candles(200);
    let config = GridBacktestConfig {
        auto_bounds: true,
        num_levels: 10,
        ..GridBacktestConfig::default()
    };

    group.bench_function("atr_derived_bounds", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(BacktestSimulator::run(black_box(&config), black_box(&candles)).await.unwrap());
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_run, bench_atr_bounds_initialization);
criterion_main!(benches);
