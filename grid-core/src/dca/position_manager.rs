//! DCAPositionManager (C6) — deal lifecycle state machine.
//!
//! States advance strictly forward: `opening -> active -> (closing ->
//! closed | failed)`. `closing` is a distinct, named state rather than
//! folded implicitly into `active`, so a deal mid-close is observable.

use crate::core::{KernelError, LocalId};
use chrono::{DateTime, Utc};
use grid_strategies::{DCAOrderConfig, SafetyOrderLevel};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStatus {
    Opening,
    Active,
    Closing,
    Closed,
    Failed,
}

impl DealStatus {
    fn can_advance_to(self, next: DealStatus) -> bool {
        use DealStatus::*;
        matches!(
            (self, next),
            (Opening, Active) | (Opening, Failed) | (Active, Closing) | (Active, Failed) | (Closing, Closed) | (Closing, Failed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct DCADeal {
    pub id: LocalId,
    pub symbol: String,
    pub status: DealStatus,
    pub base_price: Decimal,
    pub schedule: Vec<SafetyOrderLevel>,
    pub filled_so_levels: HashSet<i64>,
    /// Exchange order ids already applied, for double-fill idempotency.
    applied_fills: HashSet<String>,
    pub total_amount: Decimal,
    pub total_cost: Decimal,
    pub average_entry_price: Decimal,
    pub total_fees: Decimal,
    pub take_profit_price: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub realized_pnl: Option<Decimal>,
    pub close_reason: Option<String>,
}

impl DCADeal {
    fn transition(&mut self, next: DealStatus) -> Result<(), KernelError> {
        if !self.status.can_advance_to(next) {
            return Err(KernelError::invalid_config(format!(
                "illegal DCA deal transition {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

pub struct DCAPositionManager {
    config: DCAOrderConfig,
    deals: std::collections::HashMap<LocalId, DCADeal>,
}

impl DCAPositionManager {
    pub fn new(config: DCAOrderConfig) -> Self {
        Self {
            config,
            deals: std::collections::HashMap::new(),
        }
    }

    /// Opens a new deal, pre-computing its safety-order schedule from
    /// `base_price`. Places the deal in `Opening` until the base order fill
    /// is reported via `on_base_filled`.
    pub fn open_deal(&mut self, symbol: &str, base_price: Decimal, now: DateTime<Utc>) -> LocalId {
        let schedule = self.config.safety_order_schedule(base_price);
        let deal = DCADeal {
            id: LocalId::generate(),
            symbol: symbol.to_string(),
            status: DealStatus::Opening,
            base_price,
            schedule,
            filled_so_levels: HashSet::new(),
            applied_fills: HashSet::new(),
            total_amount: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            average_entry_price: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            take_profit_price: Decimal::ZERO,
            opened_at: now,
            closed_at: None,
            realized_pnl: None,
            close_reason: None,
        };
        let id = deal.id;
        self.deals.insert(id, deal);
        info!(deal_id = %id, symbol, base_price = %base_price, "DCA deal opened");
        id
    }

    /// Records the base-order fill: deal becomes active and take-profit is
    /// anchored to the average entry price (just the base fill so far).
    pub fn on_base_filled(
        &mut self,
        deal_id: LocalId,
        fill_id: &str,
        fill_price: Decimal,
        fill_amount: Decimal,
        fee: Decimal,
    ) -> Result<(), KernelError> {
        let deal = self.deal_mut(deal_id)?;
        if !deal.applied_fills.insert(fill_id.to_string()) {
            return Ok(()); // idempotent double-fill
        }
        deal.total_amount += fill_amount;
        deal.total_cost += fill_price * fill_amount;
        deal.total_fees += fee;
        deal.average_entry_price = deal.total_cost / deal.total_amount;
        let tp_pct = self.config.take_profit_pct;
        deal.take_profit_price = deal.average_entry_price * (Decimal::ONE + tp_pct);
        deal.transition(DealStatus::Active)?;
        Ok(())
    }

    /// Records a safety-order fill at ladder level `k`. Partial fills
    /// accumulate against the same level; a duplicate `fill_id` is a no-op.
    /// Trailing highest-price state (owned by `DCATrailingStop`) is
    /// untouched here by construction — this manager never sees it.
    pub fn on_safety_order_filled(
        &mut self,
        deal_id: LocalId,
        level: i64,
        fill_id: &str,
        fill_price: Decimal,
        fill_amount: Decimal,
        fee: Decimal,
    ) -> Result<(), KernelError> {
        let deal = self.deal_mut(deal_id)?;
        if deal.status != DealStatus::Active {
            return Err(KernelError::invalid_config("safety order fill on inactive deal"));
        }
        if !deal.applied_fills.insert(fill_id.to_string()) {
            return Ok(());
        }
        deal.total_amount += fill_amount;
        deal.total_cost += fill_price * fill_amount;
        deal.total_fees += fee;
        deal.average_entry_price = deal.total_cost / deal.total_amount;
        deal.take_profit_price = deal.average_entry_price * (Decimal::ONE + self.config.take_profit_pct);
        deal.filled_so_levels.insert(level);
        Ok(())
    }

    pub fn close_deal(
        &mut self,
        deal_id: LocalId,
        exit_price: Decimal,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Decimal, KernelError> {
        let deal = self.deal_mut(deal_id)?;
        deal.transition(DealStatus::Closing)?;
        let pnl = (exit_price - deal.average_entry_price) * deal.total_amount - deal.total_fees;
        deal.realized_pnl = Some(pnl);
        deal.close_reason = Some(reason.to_string());
        deal.closed_at = Some(now);
        deal.transition(DealStatus::Closed)?;
        info!(deal_id = %deal_id, pnl = %pnl, reason, "DCA deal closed");
        Ok(pnl)
    }

    pub fn mark_failed(&mut self, deal_id: LocalId, reason: &str) {
        if let Ok(deal) = self.deal_mut(deal_id) {
            let _ = deal.transition(DealStatus::Failed);
            deal.close_reason = Some(reason.to_string());
        }
    }

    pub fn deal(&self, id: LocalId) -> Option<&DCADeal> {
        self.deals.get(&id)
    }

    pub fn active_deals(&self) -> impl Iterator<Item = &DCADeal> {
        self.deals.values().filter(|d| d.status == DealStatus::Active)
    }

    fn deal_mut(&mut self, id: LocalId) -> Result<&mut DCADeal, KernelError> {
        self.deals
            .get_mut(&id)
            .ok_or_else(|| KernelError::invalid_config(format!("unknown deal {id}")))
    }
}
