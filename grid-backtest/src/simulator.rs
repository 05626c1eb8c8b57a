//! BacktestSimulator (C12) — the core candle loop, intra-candle sweep, and
//! equity/drawdown/Sharpe/Sortino/Calmar bookkeeping.

use crate::config::GridBacktestConfig;
use crate::ohlcv::Candle;
use crate::result::{BacktestResult, EquityPoint, TradeRecord};
use grid_core::core::errors::KernelError;
use grid_core::execution::ExecutionLayer;
use grid_core::grid::calculator::GridCalculator;
use grid_core::grid::order_manager::GridOrderManager;
use grid_core::grid::trailing::TrailingGridManager;
use grid_core::risk::RiskManager;
use grid_core::{MarketSimulator, OrderType};
use grid_strategies::{DirectionBias, GridConfig, RiskLimits, VolatilityMode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("no candles supplied")]
    EmptyCandles,
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("execution error: {0}")]
    Execution(#[from] grid_core::core::errors::ExecutionError),
}

const EPS: Decimal = dec!(0.00000001);

/// Computes the direction-shifted, epsilon-clamped initial grid bounds.
fn apply_direction_shift(upper: Decimal, lower: Decimal, direction: DirectionBias) -> (Decimal, Decimal) {
    let spread = upper - lower;
    let shift = spread * dec!(0.2);
    let (upper, lower) = match direction {
        DirectionBias::Neutral => (upper, lower),
        DirectionBias::Long => (upper - shift, lower - shift),
        DirectionBias::Short => (upper + shift, lower + shift),
    };
    (upper, lower.max(EPS))
}

fn initial_bounds(config: &GridBacktestConfig, candles: &[Candle]) -> Result<(Decimal, Decimal), BacktestError> {
    let (upper, lower) = if config.auto_bounds {
        let window_len = (config.atr_period as usize + 1).min(candles.len());
        let window = &candles[..window_len];
        let highs: Vec<Decimal> = window.iter().map(|c| c.high).collect();
        let lows: Vec<Decimal> = window.iter().map(|c| c.low).collect();
        let closes: Vec<Decimal> = window.iter().map(|c| c.close).collect();
        let atr = GridCalculator::atr(&highs, &lows, &closes, config.atr_period as usize);
        GridCalculator::adjust_bounds_by_atr(candles[0].open, atr, config.atr_multiplier)
    } else {
        (
            config.upper_price.expect("validated"),
            config.lower_price.expect("validated"),
        )
    };
    Ok(apply_direction_shift(upper, lower, config.direction))
}

fn to_grid_config(config: &GridBacktestConfig, upper: Decimal, lower: Decimal) -> GridConfig {
    GridConfig {
        symbol: config.symbol.clone(),
        volatility_mode: VolatilityMode::Custom,
        grid_spacing: config.grid_spacing,
        num_levels: config.num_levels,
        amount_per_grid: config.amount_per_grid,
        profit_per_grid: config.profit_per_grid,
        atr_multiplier: config.atr_multiplier,
        atr_period: config.atr_period,
        upper_price: Some(upper),
        lower_price: Some(lower),
        direction: config.direction,
    }
}

fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

/// Sample standard deviation (n-1 divisor).
fn sample_std(xs: &[f64], mean_val: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs.iter().map(|x| (x - mean_val).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
    var.sqrt()
}

fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let m = mean(returns);
    let sd = sample_std(returns, m);
    if sd == 0.0 {
        return 0.0;
    }
    (m / sd) * periods_per_year.sqrt()
}

fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let m = mean(returns);
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return if m > 0.0 { f64::INFINITY } else { 0.0 };
    }
    let downside_var = downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64;
    let downside_std = downside_var.sqrt();
    if downside_std == 0.0 {
        return 0.0;
    }
    (m / downside_std) * periods_per_year.sqrt()
}

pub struct BacktestSimulator;

impl BacktestSimulator {
    /// Runs one backtest end to end. Deterministic: identical
    /// `(config, candles)` always produce a byte-identical `BacktestResult`.
    pub async fn run(config: &GridBacktestConfig, candles: &[Candle]) -> Result<BacktestResult, BacktestError> {
        config.validate().map_err(|e| KernelError::invalid_config(e.to_string()))?;
        if candles.is_empty() {
            return Err(BacktestError::EmptyCandles);
        }

        let (mut upper, mut lower) = initial_bounds(config, candles)?;
        let mut grid_config = to_grid_config(config, upper, lower);

        let sim = MarketSimulator::new(
            config.symbol.clone(),
            config.initial_balance,
            config.fees,
            config.slippage,
            candles[0].timestamp,
        );
        let mut order_manager = GridOrderManager::new(grid_config.clone());
        let mut risk_manager = RiskManager::new(RiskLimits {
            max_position_size: config.initial_balance * dec!(1000),
            max_order_size: config.amount_per_grid * dec!(1000),
            min_order_size: Decimal::ZERO,
            stop_loss_pct: config.stop_loss_pct,
            max_daily_loss: None,
            max_drawdown_pct: config.max_drawdown_pct,
        });
        risk_manager.initialize_balance(config.initial_balance);
        let mut trailing_manager = config.trailing.clone().map(TrailingGridManager::new);

        let levels = GridCalculator::levels(grid_config.grid_spacing, upper, lower, grid_config.num_levels)?;
        let initial_orders = GridCalculator::grid_orders(&levels, candles[0].open, grid_config.amount_per_grid);
        let pending = order_manager.calculate_initial_orders(&initial_orders, candles[0].timestamp);
        Self::place_pending(&sim, &mut order_manager, &pending, candles[0].timestamp).await?;

        let mut equity_curve = Vec::with_capacity(candles.len());
        let mut trade_history = Vec::new();
        let mut returns = Vec::with_capacity(candles.len());
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut total_fees = Decimal::ZERO;
        let mut peak_equity = config.initial_balance;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_one_sided_exposure = Decimal::ZERO;
        let mut sum_deployed_fraction = Decimal::ZERO;
        let mut price_left_grid_count = 0u64;
        let mut stopped_by_risk = false;
        let mut stop_reason: Option<String> = None;
        let mut prev_equity: Option<Decimal> = None;
        let mut bars_processed = 0u64;

        'candles: for (idx, candle) in candles.iter().enumerate() {
            sim.set_clock(candle.timestamp);
            let sweep: [Decimal; 4] = if candle.is_up_bar() {
                [candle.open, candle.high, candle.low, candle.close]
            } else {
                [candle.open, candle.low, candle.high, candle.close]
            };

            for price in sweep {
                let fills = sim.set_price(price);
                for fill in fills {
                    let cycles_before = order_manager.completed_cycles().len();
                    let counter = order_manager.on_order_filled(&fill.order_id, fill.price, fill.amount, fill.fee, candle.timestamp)?;
                    let cycle_profit = if order_manager.completed_cycles().len() > cycles_before {
                        let profit = order_manager.completed_cycles().last().unwrap().profit;
                        if profit > Decimal::ZERO {
                            gross_profit += profit;
                        } else {
                            gross_loss += -profit;
                        }
                        Some(profit)
                    } else {
                        None
                    };
                    total_fees += fill.fee;
                    trade_history.push(TradeRecord {
                        timestamp: candle.timestamp,
                        side: fill.side,
                        price: fill.price,
                        amount: fill.amount,
                        fee: fill.fee,
                        cycle_profit,
                    });

                    let ack = sim
                        .create_order(
                            &config.symbol,
                            OrderType::Limit,
                            counter.grid_level.side,
                            counter.grid_level.amount,
                            Some(counter.grid_level.price),
                        )
                        .await?;
                    order_manager.register_exchange_order(counter.id, ack.id, candle.timestamp)?;
                }
            }

            let (buy_notional, sell_notional) = order_manager.open_orders().fold(
                (Decimal::ZERO, Decimal::ZERO),
                |(buy, sell), o| match o.grid_level.side {
                    grid_core::Side::Buy => (buy + o.grid_level.price * o.grid_level.amount, sell),
                    grid_core::Side::Sell => (buy, sell + o.grid_level.price * o.grid_level.amount),
                },
            );
            if config.initial_balance > Decimal::ZERO {
                let one_sided = buy_notional.max(sell_notional) / config.initial_balance;
                max_one_sided_exposure = max_one_sided_exposure.max(one_sided);
                sum_deployed_fraction += (buy_notional + sell_notional) / config.initial_balance;
            }
            if candle.close < lower || candle.close > upper {
                price_left_grid_count += 1;
            }

            if let Some(trailing) = trailing_manager.as_mut() {
                trailing.tick();
                let recent_bars = if matches!(config.trailing.as_ref().unwrap().recenter_mode, grid_strategies::RecenterMode::Atr) {
                    let start = idx.saturating_sub(grid_config.atr_period as usize);
                    let window = &candles[start..=idx];
                    Some((window.iter().map(|c| c.high).collect::<Vec<_>>(), window.iter().map(|c| c.low).collect::<Vec<_>>(), window.iter().map(|c| c.close).collect::<Vec<_>>()))
                } else {
                    None
                };
                let recent_ref = recent_bars.as_ref().map(|(h, l, c)| (h.as_slice(), l.as_slice(), c.as_slice()));
                if let Some(new_grid_config) = trailing.check_and_shift(candle.close, upper, lower, &grid_config, recent_ref) {
                    let new_upper = new_grid_config.upper_price.expect("trailing always sets bounds");
                    let new_lower = new_grid_config.lower_price.expect("trailing always sets bounds");
                    let new_levels = GridCalculator::levels(new_grid_config.grid_spacing, new_upper, new_lower, new_grid_config.num_levels)?;
                    let new_orders = GridCalculator::grid_orders(&new_levels, candle.close, new_grid_config.amount_per_grid);
                    let (to_cancel, new_pending) = order_manager.rebalance(&new_orders, candle.timestamp);
                    for exchange_id in to_cancel {
                        sim.cancel_order(&exchange_id, Some(&config.symbol)).await?;
                    }
                    order_manager.set_config(new_grid_config.clone());
                    Self::place_pending(&sim, &mut order_manager, &new_pending, candle.timestamp).await?;
                    grid_config = new_grid_config;
                    upper = new_upper;
                    lower = new_lower;
                    info!(shift_count = trailing.shift_count(), "trailing grid shifted");
                }
            }

            let equity = sim.get_portfolio_value();
            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp,
                equity,
                price: candle.close,
            });
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = if peak_equity > Decimal::ZERO {
                (peak_equity - equity) / peak_equity
            } else {
                Decimal::ZERO
            };
            max_drawdown = max_drawdown.max(drawdown);

            if let Some(prev) = prev_equity {
                if prev > Decimal::ZERO {
                    returns.push(dec_to_f64((equity - prev) / prev));
                } else {
                    returns.push(0.0);
                }
            }
            prev_equity = Some(equity);
            bars_processed += 1;

            risk_manager.update_balance(equity, candle.timestamp);

            if let Some(tp) = config.take_profit_pct {
                if config.initial_balance > Decimal::ZERO && (equity - config.initial_balance) / config.initial_balance >= tp {
                    stop_reason = Some("take_profit_reached".to_string());
                    info!(equity = %equity, "take-profit reached, stopping run");
                    break 'candles;
                }
            }

            if risk_manager.is_halted() {
                stopped_by_risk = true;
                stop_reason = risk_manager.halt_reason().map(str::to_string);
                warn!(reason = ?stop_reason, "risk manager halted run");
                break 'candles;
            }
            if let Some(max_dd) = config.max_drawdown_pct {
                if max_drawdown >= max_dd {
                    stopped_by_risk = true;
                    stop_reason = Some("max_drawdown_exceeded".to_string());
                    warn!(max_drawdown = %max_drawdown, "max drawdown exceeded, stopping run");
                    break 'candles;
                }
            }
        }

        let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(config.initial_balance);
        let total_pnl = final_equity - config.initial_balance;
        let total_return_pct = if config.initial_balance > Decimal::ZERO {
            total_pnl / config.initial_balance * dec!(100)
        } else {
            Decimal::ZERO
        };
        let cycles = order_manager.completed_cycles();
        let wins = cycles.iter().filter(|c| c.profit > Decimal::ZERO).count();
        let win_rate = if cycles.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(wins as u64) / Decimal::from(cycles.len() as u64)
        };
        let profit_factor = if gross_loss == Decimal::ZERO {
            if gross_profit > Decimal::ZERO {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            dec_to_f64(gross_profit / gross_loss)
        };
        let capital_efficiency = if bars_processed > 0 {
            sum_deployed_fraction / Decimal::from(bars_processed)
        } else {
            Decimal::ZERO
        };
        let avg_profit_per_cycle = if cycles.is_empty() {
            Decimal::ZERO
        } else {
            cycles.iter().map(|c| c.profit).sum::<Decimal>() / Decimal::from(cycles.len() as u64)
        };
        let periods_per_year = config.periods_per_year();
        let duration_seconds = (candles[candles.len() - 1].timestamp - candles[0].timestamp).num_seconds();

        Ok(BacktestResult {
            symbol: config.symbol.clone(),
            total_return_pct,
            total_pnl,
            final_equity,
            max_drawdown_pct: max_drawdown * dec!(100),
            total_trades: trade_history.len() as u64,
            win_rate,
            completed_cycles: cycles.len() as u64,
            grid_fill_rate: order_manager.grid_fill_rate(grid_config.num_levels),
            sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
            sortino_ratio: sortino_ratio(&returns, periods_per_year),
            calmar_ratio: if max_drawdown > Decimal::ZERO {
                (dec_to_f64(total_return_pct) / 100.0 / dec_to_f64(max_drawdown)).abs()
            } else {
                0.0
            },
            profit_factor,
            capital_efficiency,
            total_fees,
            equity_curve,
            trade_history,
            stopped_by_risk,
            stop_reason,
            duration_seconds,
            price_left_grid_count,
            max_one_sided_exposure,
            avg_profit_per_cycle,
        })
    }

    async fn place_pending(
        sim: &MarketSimulator,
        order_manager: &mut GridOrderManager,
        pending: &[grid_core::grid::order_manager::GridOrderState],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), BacktestError> {
        for order in pending {
            let ack = sim
                .create_order(
                    order_manager.config().symbol.as_str(),
                    OrderType::Limit,
                    order.grid_level.side,
                    order.grid_level.amount,
                    Some(order.grid_level.price),
                )
                .await?;
            order_manager.register_exchange_order(order.id, ack.id, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(hour: u32, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: dec!(1),
        }
    }

    fn flat_candles(n: usize, price: Decimal) -> Vec<Candle> {
        (0..n as u32).map(|h| candle(h, price, price, price, price)).collect()
    }

    #[tokio::test]
    async fn flat_market_produces_no_fills_and_zero_pnl() {
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            num_levels: 4,
            ..GridBacktestConfig::default()
        };
        let candles = flat_candles(5, dec!(100));
        let result = BacktestSimulator::run(&config, &candles).await.unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.completed_cycles, 0);
        assert_eq!(result.total_pnl, Decimal::ZERO);
    }

    #[tokio::test]
    async fn oscillating_market_completes_grid_cycles_profitably() {
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(120)),
            lower_price: Some(dec!(80)),
            num_levels: 5,
            profit_per_grid: dec!(0.02),
            amount_per_grid: dec!(100),
            ..GridBacktestConfig::default()
        };
        let mut candles = vec![candle(0, dec!(100), dec!(100), dec!(100), dec!(100))];
        for h in 1..20u32 {
            let (low, high) = if h % 2 == 0 { (dec!(85), dec!(100)) } else { (dec!(100), dec!(115)) };
            candles.push(candle(h, dec!(100), high, low, dec!(100)));
        }
        let result = BacktestSimulator::run(&config, &candles).await.unwrap();
        assert!(result.total_trades > 0);
        assert!(result.completed_cycles > 0);
    }

    #[tokio::test]
    async fn determinism_same_inputs_yield_identical_results() {
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(90)),
            num_levels: 4,
            ..GridBacktestConfig::default()
        };
        let candles = flat_candles(10, dec!(100));
        let r1 = BacktestSimulator::run(&config, &candles).await.unwrap();
        let r2 = BacktestSimulator::run(&config, &candles).await.unwrap();
        assert_eq!(r1, r2);
    }

    #[tokio::test]
    async fn take_profit_stops_run_early() {
        let config = GridBacktestConfig {
            auto_bounds: false,
            upper_price: Some(dec!(150)),
            lower_price: Some(dec!(50)),
            num_levels: 4,
            profit_per_grid: dec!(0.01),
            take_profit_pct: Some(dec!(0.001)),
            initial_balance: dec!(1000),
            ..GridBacktestConfig::default()
        };
        let mut candles = vec![candle(0, dec!(100), dec!(100), dec!(100), dec!(100))];
        for h in 1..5u32 {
            candles.push(candle(h, dec!(100), dec!(130), dec!(70), dec!(100)));
        }
        let result = BacktestSimulator::run(&config, &candles).await.unwrap();
        assert_eq!(result.stop_reason.as_deref(), Some("take_profit_reached"));
        assert!(result.equity_curve.len() < candles.len());
    }
}
