//! GridOrderManager (C5) — grid order lifecycle state machine and
//! counter-order generation.
//!
//! Order state is a runtime `GridOrderStatus` enum rather than a compile-time
//! typestate, because the grid size is only known at configuration time.

use super::calculator::GridLevel;
use crate::core::{KernelError, LocalId, Side};
use crate::execution::ExchangeOrderId;
use chrono::{DateTime, Utc};
use grid_strategies::GridConfig;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Lifecycle state of one grid order. Transitions are monotonic:
/// `Pending -> Open -> {Filled, Cancelled, Failed}`. No regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridOrderStatus {
    Pending,
    Open,
    Filled,
    Cancelled,
    Failed,
}

impl GridOrderStatus {
    fn can_advance_to(self, next: GridOrderStatus) -> bool {
        use GridOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Open)
                | (Pending, Filled)
                | (Pending, Cancelled)
                | (Pending, Failed)
                | (Open, Filled)
                | (Open, Cancelled)
                | (Open, Failed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct GridOrderState {
    pub id: LocalId,
    pub grid_level: GridLevel,
    pub exchange_order_id: Option<ExchangeOrderId>,
    pub status: GridOrderStatus,
    pub filled_price: Option<Decimal>,
    pub filled_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The order this one was spawned as a counter-order for, if any. Used
    /// to close a cycle when the counter-order itself fills.
    pub parent: Option<LocalId>,
}

impl GridOrderState {
    fn new(grid_level: GridLevel, now: DateTime<Utc>, parent: Option<LocalId>) -> Self {
        Self {
            id: LocalId::generate(),
            grid_level,
            exchange_order_id: None,
            status: GridOrderStatus::Pending,
            filled_price: None,
            filled_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
            parent,
        }
    }

    fn transition(&mut self, next: GridOrderStatus, now: DateTime<Utc>) -> Result<(), KernelError> {
        if !self.status.can_advance_to(next) {
            return Err(KernelError::invalid_config(format!(
                "illegal grid order transition {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// A matched buy-then-sell (or sell-then-buy) pair, closed when the
/// counter-order of an earlier fill fills. The unit of realized P/L.
#[derive(Debug, Clone)]
pub struct GridCycle {
    pub buy_order_id: LocalId,
    pub sell_order_id: LocalId,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub buy_amount: Decimal,
    pub profit: Decimal,
}

/// Exclusive owner of every `GridOrderState` for one grid (
/// Ownership). All mutation is expected to happen on a single logical task
/// — no internal locking.
pub struct GridOrderManager {
    config: GridConfig,
    orders: HashMap<LocalId, GridOrderState>,
    by_exchange_id: HashMap<ExchangeOrderId, LocalId>,
    completed_cycles: Vec<GridCycle>,
    distinct_levels_filled: std::collections::HashSet<u32>,
}

impl GridOrderManager {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            orders: HashMap::new(),
            by_exchange_id: HashMap::new(),
            completed_cycles: Vec::new(),
            distinct_levels_filled: std::collections::HashSet::new(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GridConfig) {
        self.config = config;
    }

    /// Emit pending `GridOrderState` entries for every level.
    pub fn calculate_initial_orders(&mut self, levels: &[GridLevel], now: DateTime<Utc>) -> Vec<GridOrderState> {
        let mut created = Vec::with_capacity(levels.len());
        for &level in levels {
            let order = GridOrderState::new(level, now, None);
            self.orders.insert(order.id, order.clone());
            created.push(order);
        }
        info!(count = created.len(), "grid initialized");
        created
    }

    pub fn register_exchange_order(
        &mut self,
        local_id: LocalId,
        exchange_id: ExchangeOrderId,
        now: DateTime<Utc>,
    ) -> Result<(), KernelError> {
        let order = self
            .orders
            .get_mut(&local_id)
            .ok_or_else(|| KernelError::invalid_config(format!("unknown local order {local_id}")))?;
        order.transition(GridOrderStatus::Open, now)?;
        order.exchange_order_id = Some(exchange_id.clone());
        self.by_exchange_id.insert(exchange_id, local_id);
        Ok(())
    }

    pub fn mark_order_failed(&mut self, local_id: LocalId, reason: &str, now: DateTime<Utc>) {
        if let Some(order) = self.orders.get_mut(&local_id) {
            if order.transition(GridOrderStatus::Failed, now).is_ok() {
                warn!(order_id = %local_id, reason, "grid order failed");
            }
        }
    }

    /// Handle a fill: mark the matching order filled, then spawn its
    /// counter-order. A buy fill spawns a sell at
    /// `filled_price * (1 + profit_per_grid)`; a sell fill spawns a buy at
    /// `filled_price * (1 - profit_per_grid)`. When the counter-order later
    /// fills, the cycle closes and its profit is
    /// `(sell_price - buy_price) * amount - fees`.
    pub fn on_order_filled(
        &mut self,
        exchange_id: &ExchangeOrderId,
        filled_price: Decimal,
        filled_amount: Decimal,
        fees_paid: Decimal,
        now: DateTime<Utc>,
    ) -> Result<GridOrderState, KernelError> {
        let local_id = *self
            .by_exchange_id
            .get(exchange_id)
            .ok_or_else(|| KernelError::SimulatorInconsistent(format!("fill for unknown order {exchange_id}")))?;

        let (side, level, parent) = {
            let order = self
                .orders
                .get_mut(&local_id)
                .ok_or_else(|| KernelError::invalid_config("order vanished"))?;
            order.transition(GridOrderStatus::Filled, now)?;
            order.filled_price = Some(filled_price);
            order.filled_amount = filled_amount;
            (order.grid_level.side, order.grid_level, order.parent)
        };
        self.distinct_levels_filled.insert(level.index);

        debug!(order_id = %local_id, ?side, price = %filled_price, "grid order filled");

        // If this fill closes a cycle (it is itself a counter-order), record it.
        if let Some(parent_id) = parent {
            if let Some(parent_order) = self.orders.get(&parent_id) {
                let (buy_id, sell_id, buy_price, sell_price) = match side {
                    Side::Sell => (parent_id, local_id, parent_order.filled_price.unwrap_or_default(), filled_price),
                    Side::Buy => (local_id, parent_id, filled_price, parent_order.filled_price.unwrap_or_default()),
                };
                let profit = (sell_price - buy_price) * filled_amount - fees_paid;
                self.completed_cycles.push(GridCycle {
                    buy_order_id: buy_id,
                    sell_order_id: sell_id,
                    buy_price,
                    sell_price,
                    buy_amount: filled_amount,
                    profit,
                });
            }
        }

        let (counter_price, counter_side) = match side {
            Side::Buy => (filled_price * (Decimal::ONE + self.config.profit_per_grid), Side::Sell),
            Side::Sell => (filled_price * (Decimal::ONE - self.config.profit_per_grid), Side::Buy),
        };
        let counter_amount = self.config.amount_per_grid / counter_price;
        let counter_level = GridLevel {
            index: level.index,
            price: counter_price,
            amount: counter_amount,
            side: counter_side,
        };
        let counter_order = GridOrderState::new(counter_level, now, Some(local_id));
        self.orders.insert(counter_order.id, counter_order.clone());
        Ok(counter_order)
    }

    /// Returns `(order_ids_to_cancel, new_pending_orders)` for the caller to
    /// drive the exchange.
    pub fn rebalance(
        &mut self,
        new_levels: &[GridLevel],
        now: DateTime<Utc>,
    ) -> (Vec<ExchangeOrderId>, Vec<GridOrderState>) {
        let to_cancel: Vec<ExchangeOrderId> = self
            .orders
            .values()
            .filter(|o| matches!(o.status, GridOrderStatus::Open | GridOrderStatus::Pending))
            .filter_map(|o| o.exchange_order_id.clone())
            .collect();

        for o in self.orders.values_mut() {
            if matches!(o.status, GridOrderStatus::Open | GridOrderStatus::Pending) {
                let _ = o.transition(GridOrderStatus::Cancelled, now);
            }
        }

        let new_orders = self.calculate_initial_orders(new_levels, now);
        (to_cancel, new_orders)
    }

    pub fn order(&self, id: LocalId) -> Option<&GridOrderState> {
        self.orders.get(&id)
    }

    pub fn open_orders(&self) -> impl Iterator<Item = &GridOrderState> {
        self.orders
            .values()
            .filter(|o| matches!(o.status, GridOrderStatus::Open | GridOrderStatus::Pending))
    }

    pub fn completed_cycles(&self) -> &[GridCycle] {
        &self.completed_cycles
    }

    pub fn grid_fill_rate(&self, num_levels: u32) -> Decimal {
        if num_levels == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.distinct_levels_filled.len() as u64) / Decimal::from(num_levels)
    }

    /// Reconciles every locally `open` order against `exchange_open`, the
    /// exchange's current open-order set, after a restart:
    /// present on the exchange ⇒ keep; registered but absent ⇒ treat as
    /// filled at its own limit price, exactly as `on_order_filled` would;
    /// never acknowledged (no exchange id yet) and absent ⇒ remove.
    pub fn reconcile(&mut self, exchange_open: &[ExchangeOrderId], now: DateTime<Utc>) -> ReconciliationReport {
        let exchange_open: std::collections::HashSet<&ExchangeOrderId> = exchange_open.iter().collect();
        let stale: Vec<LocalId> = self
            .orders
            .values()
            .filter(|o| o.status == GridOrderStatus::Open)
            .filter(|o| o.exchange_order_id.as_ref().map_or(true, |id| !exchange_open.contains(id)))
            .map(|o| o.id)
            .collect();

        let mut actions = Vec::with_capacity(stale.len());
        for local_id in stale {
            let Some(order) = self.orders.get(&local_id) else { continue };
            match order.exchange_order_id.clone() {
                None => {
                    self.orders.remove(&local_id);
                    warn!(order_id = %local_id, "reconciliation: removed order never acknowledged by exchange");
                    actions.push((local_id, ReconciliationAction::RemovedAbsent));
                }
                Some(exchange_id) => {
                    let price = order.grid_level.price;
                    let amount = order.grid_level.amount;
                    match self.on_order_filled(&exchange_id, price, amount, Decimal::ZERO, now) {
                        Ok(_) => {
                            info!(order_id = %local_id, "reconciliation: order closed by fill since last snapshot");
                            actions.push((local_id, ReconciliationAction::ClosedByFill));
                        }
                        Err(_) => {
                            self.orders.remove(&local_id);
                            warn!(order_id = %local_id, "reconciliation: removed order absent from exchange");
                            actions.push((local_id, ReconciliationAction::RemovedAbsent));
                        }
                    }
                }
            }
        }

        ReconciliationReport { actions }
    }
}

/// Outcome of reconciling one restored order against the exchange's
/// current open-order set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationAction {
    RemovedAbsent,
    ClosedByFill,
}

#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub actions: Vec<(LocalId, ReconciliationAction)>,
}

impl ReconciliationReport {
    pub fn removed_count(&self) -> usize {
        self.actions.iter().filter(|(_, a)| *a == ReconciliationAction::RemovedAbsent).count()
    }

    pub fn closed_count(&self) -> usize {
        self.actions.iter().filter(|(_, a)| *a == ReconciliationAction::ClosedByFill).count()
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

    fn config() -> GridConfig {
        GridConfig {
            symbol: "BTC/USDT".into(),
            volatility_mode: grid_strategies::VolatilityMode::Medium,
            grid_spacing: grid_strategies::GridSpacing::Arithmetic,
            num_levels: 5,
            amount_per_grid: dec!(100),
            profit_per_grid: dec!(0.01),
            atr_multiplier: dec!(2),
            atr_period: 14,
            upper_price: Some(dec!(110)),
            lower_price: Some(dec!(100)),
            direction: Default::default(),
        }
    }

    fn level(index: u32, price: Decimal, side: Side) -> GridLevel {
        GridLevel {
            index,
            price,
            amount: dec!(1),
            side,
        }
    }

    #[test]
    fn transitions_never_regress() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let id = created[0].id;

        let eid = ExchangeOrderId("ex-1".into());
        mgr.register_exchange_order(id, eid.clone(), now()).unwrap();
        assert_eq!(mgr.order(id).unwrap().status, GridOrderStatus::Open);

        mgr.on_order_filled(&eid, dec!(100), dec!(1), Decimal::ZERO, now()).unwrap();
        assert_eq!(mgr.order(id).unwrap().status, GridOrderStatus::Filled);

        // Attempting to re-register after fill must fail (no regression).
        assert!(mgr.register_exchange_order(id, ExchangeOrderId("ex-2".into()), now()).is_err());
    }

    #[test]
    fn buy_fill_spawns_sell_counter_order() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let id = created[0].id;
        let eid = ExchangeOrderId("ex-1".into());
        mgr.register_exchange_order(id, eid.clone(), now()).unwrap();

        let counter = mgr.on_order_filled(&eid, dec!(100), dec!(1), Decimal::ZERO, now()).unwrap();
        assert_eq!(counter.grid_level.side, Side::Sell);
        assert_eq!(counter.grid_level.price, dec!(101)); // 100 * 1.01
    }

    #[test]
    fn closing_counter_order_records_cycle_profit() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let buy_id = created[0].id;
        let buy_eid = ExchangeOrderId("buy-1".into());
        mgr.register_exchange_order(buy_id, buy_eid.clone(), now()).unwrap();
        let counter = mgr.on_order_filled(&buy_eid, dec!(100), dec!(1), Decimal::ZERO, now()).unwrap();

        let sell_eid = ExchangeOrderId("sell-1".into());
        mgr.register_exchange_order(counter.id, sell_eid.clone(), now()).unwrap();
        mgr.on_order_filled(&sell_eid, dec!(101), dec!(1), Decimal::ZERO, now()).unwrap();

        assert_eq!(mgr.completed_cycles().len(), 1);
        assert_eq!(mgr.completed_cycles()[0].profit, dec!(1)); // (101-100)*1
    }

    #[test]
    fn rebalance_cancels_open_orders_and_places_new_ones() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        mgr.register_exchange_order(created[0].id, ExchangeOrderId("ex-1".into()), now()).unwrap();

        let new_levels = vec![level(0, dec!(95), Side::Buy)];
        let (to_cancel, new_orders) = mgr.rebalance(&new_levels, now());
        assert_eq!(to_cancel.len(), 1);
        assert_eq!(new_orders.len(), 1);
        assert_eq!(mgr.order(created[0].id).unwrap().status, GridOrderStatus::Cancelled);
    }

    #[test]
    fn reconcile_keeps_orders_still_open_on_exchange() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let eid = ExchangeOrderId("ex-1".into());
        mgr.register_exchange_order(created[0].id, eid.clone(), now()).unwrap();

        let report = mgr.reconcile(&[eid], now());
        assert!(report.actions.is_empty());
        assert_eq!(mgr.order(created[0].id).unwrap().status, GridOrderStatus::Open);
    }

    #[test]
    fn reconcile_closes_orders_filled_while_offline() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let id = created[0].id;
        let eid = ExchangeOrderId("ex-1".into());
        mgr.register_exchange_order(id, eid, now()).unwrap();

        // Exchange no longer reports this order as open: it filled while we
        // were down.
        let report = mgr.reconcile(&[], now());
        assert_eq!(report.closed_count(), 1);
        assert_eq!(mgr.order(id).unwrap().status, GridOrderStatus::Filled);
        // A counter-order should have been spawned, just as a live fill would.
        assert_eq!(mgr.open_orders().count(), 1);
    }

    #[test]
    fn reconcile_removes_orders_never_acknowledged() {
        let mut mgr = GridOrderManager::new(config());
        let levels = vec![level(0, dec!(100), Side::Buy)];
        let created = mgr.calculate_initial_orders(&levels, now());
        let id = created[0].id;

        // Never registered with an exchange id (still Pending, not Open) —
        // reconcile should leave it untouched since only Open orders are
        // considered.
        let report = mgr.reconcile(&[], now());
        assert!(report.actions.is_empty());
        assert_eq!(mgr.order(id).unwrap().status, GridOrderStatus::Pending);
    }
}
