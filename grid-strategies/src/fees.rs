//! Fee schedule shared by `MarketSimulator` and the live `ExecutionLayer`:
//! maker fee for limit fills, taker for market; fee is denominated in
//! base currency for buys, quote currency for sells.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fee rates expressed as fractions (0.001 = 10 bps), not basis points —
/// the kernel's monetary math stays in `Decimal` end to end, never crossing
/// into integer bps and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
}

impl FeeSchedule {
    pub const fn new(maker_fee: Decimal, taker_fee: Decimal) -> Self {
        Self {
            maker_fee,
            taker_fee,
        }
    }

    pub fn zero() -> Self {
        Self {
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
        }
    }

    /// Fee charged on a limit-order fill of `amount` base units at `price`.
    /// Buys pay the fee in base currency (deducted from `amount`); sells pay
    /// it in quote currency (deducted from proceeds).
    pub fn maker_fee_amount(&self, price: Decimal, amount: Decimal, is_buy: bool) -> Decimal {
        Self::fee_amount(self.maker_fee, price, amount, is_buy)
    }

    pub fn taker_fee_amount(&self, price: Decimal, amount: Decimal, is_buy: bool) -> Decimal {
        Self::fee_amount(self.taker_fee, price, amount, is_buy)
    }

    fn fee_amount(rate: Decimal, price: Decimal, amount: Decimal, is_buy: bool) -> Decimal {
        if is_buy {
            amount * rate
        } else {
            amount * price * rate
        }
    }

    pub fn round_trip(&self) -> Decimal {
        self.maker_fee + self.taker_fee
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::zero()
    }
}
