//! GridCalculator (C3) — pure, stateless computation.

use crate::core::{KernelError, Side};
use grid_strategies::GridSpacing;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

/// One price level in a grid, with the side it would be placed on relative
/// to the current price at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLevel {
    pub index: u32,
    pub price: Decimal,
    pub amount: Decimal,
    pub side: Side,
}

pub struct GridCalculator;

impl GridCalculator {
    /// Equal additive step. Level 0 = `lower`, level `n-1` = `upper`.
    pub fn arithmetic_levels(upper: Decimal, lower: Decimal, n: u32) -> Result<Vec<Decimal>, KernelError> {
        if n < 2 {
            return Err(KernelError::invalid_config("num_levels must be >= 2"));
        }
        if upper <= lower {
            return Err(KernelError::invalid_config("upper_price must be > lower_price"));
        }
        let step = (upper - lower) / Decimal::from(n - 1);
        Ok((0..n).map(|i| lower + step * Decimal::from(i)).collect())
    }

    /// Equal multiplicative ratio `r = (upper/lower)^(1/(n-1))`.
    pub fn geometric_levels(upper: Decimal, lower: Decimal, n: u32) -> Result<Vec<Decimal>, KernelError> {
        if n < 2 {
            return Err(KernelError::invalid_config("num_levels must be >= 2"));
        }
        if upper <= lower || lower <= Decimal::ZERO {
            return Err(KernelError::invalid_config("upper_price must be > lower_price > 0"));
        }
        let ratio = (upper / lower).powd(Decimal::ONE / Decimal::from(n - 1));
        let mut levels = Vec::with_capacity(n as usize);
        let mut price = lower;
        for _ in 0..n {
            levels.push(price);
            price *= ratio;
        }
        // Force exact boundary to avoid float/powd drift leaving the top
        // level a few ulps off `upper`.
        *levels.last_mut().unwrap() = upper;
        Ok(levels)
    }

    pub fn levels(spacing: GridSpacing, upper: Decimal, lower: Decimal, n: u32) -> Result<Vec<Decimal>, KernelError> {
        match spacing {
            GridSpacing::Arithmetic => Self::arithmetic_levels(upper, lower, n),
            GridSpacing::Geometric => Self::geometric_levels(upper, lower, n),
        }
    }

    /// Standard true-range mean over the last `period` bars. Falls back to
    /// 1% of the latest close when there isn't enough history or every true
    /// range collapses to zero.
    pub fn atr(highs: &[Decimal], lows: &[Decimal], closes: &[Decimal], period: usize) -> Decimal {
        if highs.len() < 2 || highs.len() != lows.len() || highs.len() != closes.len() {
            return closes.last().copied().unwrap_or(Decimal::ZERO) * dec!(0.01);
        }
        let mut true_ranges = Vec::with_capacity(highs.len() - 1);
        for i in 1..highs.len() {
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - closes[i - 1]).abs();
            let lc = (lows[i] - closes[i - 1]).abs();
            true_ranges.push(hl.max(hc).max(lc));
        }
        let take = period.min(true_ranges.len()).max(1);
        let recent = &true_ranges[true_ranges.len() - take..];
        let atr = recent.iter().sum::<Decimal>() / Decimal::from(take as u64);
        if atr.is_zero() {
            closes.last().copied().unwrap_or(Decimal::ZERO) * dec!(0.01)
        } else {
            atr
        }
    }

    /// `upper = price + atr*mult`, `lower = max(price - atr*mult, eps)`.
    pub fn adjust_bounds_by_atr(price: Decimal, atr: Decimal, multiplier: Decimal) -> (Decimal, Decimal) {
        let eps = dec!(0.00000001);
        let upper = price + atr * multiplier;
        let lower = (price - atr * multiplier).max(eps);
        (upper, lower)
    }

    /// Levels strictly below `current_price` become buy orders, strictly
    /// above become sell orders; a level exactly at the current price is
    /// skipped.
    pub fn grid_orders(levels: &[Decimal], current_price: Decimal, amount_quote: Decimal) -> Vec<GridLevel> {
        let mut out = Vec::with_capacity(levels.len());
        for (i, &price) in levels.iter().enumerate() {
            let side = if price < current_price {
                Side::Buy
            } else if price > current_price {
                Side::Sell
            } else {
                continue;
            };
            if price <= Decimal::ZERO {
                continue;
            }
            out.push(GridLevel {
                index: i as u32,
                price,
                amount: amount_quote / price,
                side,
            });
        }
        out
    }
}
