//! The order lifecycle engine.

use std::sync::Arc;

use chrono::{Duration, Utc};

use common::{Money, OrderId, UserId};
use order_store::{NewOrder, Order, OrderLine, OrderPage, OrderStatus, OrderStore};

use crate::error::{EngineError, Result};
use crate::ports::identity::IdentityPort;
use crate::ports::inventory::InventoryPort;
use crate::sweep::{self, SweepConfig, SweepHandle};

/// Drives orders through their lifecycle.
///
/// Validates status transitions, orchestrates settlement against the
/// inventory port, and exposes cancellation. Every operation re-reads
/// current state from the store before validating a transition; the
/// engine holds no cached copies between calls.
#[derive(Clone)]
pub struct OrderEngine<S, I> {
    store: S,
    inventory: I,
    identity: Option<Arc<dyn IdentityPort>>,
}

impl<S, I> OrderEngine<S, I>
where
    S: OrderStore,
    I: InventoryPort,
{
    /// Creates an engine without owner validation.
    pub fn new(store: S, inventory: I) -> Self {
        Self {
            store,
            inventory,
            identity: None,
        }
    }

    /// Attaches an identity port; subsequent order creation validates
    /// the owner against it.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityPort>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Creates a new pending order for the given owner.
    ///
    /// Validates line quantities and the caller-supplied total against
    /// the line sum, then validates the owner when an identity port is
    /// configured.
    #[tracing::instrument(skip(self, lines, shipping_address))]
    pub async fn create_order(
        &self,
        owner_id: UserId,
        lines: Vec<OrderLine>,
        total: Money,
        shipping_address: impl Into<String>,
    ) -> Result<Order> {
        if lines.is_empty() {
            return Err(EngineError::InvalidOrder("order has no lines".to_string()));
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(EngineError::InvalidOrder(format!(
                    "zero quantity for product {}",
                    line.product_id
                )));
            }
        }
        let line_sum: Money = lines.iter().map(OrderLine::line_total).sum();
        if line_sum != total {
            return Err(EngineError::InvalidOrder(format!(
                "total {total} does not match line sum {line_sum}"
            )));
        }

        if let Some(identity) = &self.identity {
            match identity.exists(owner_id).await {
                Ok(true) => {}
                Ok(false) => return Err(EngineError::InvalidOwner(owner_id)),
                Err(e) => {
                    tracing::warn!(%owner_id, error = %e, "owner validation failed");
                    return Err(EngineError::InvalidOwner(owner_id));
                }
            }
        }

        let order = self
            .store
            .create(NewOrder::pending(owner_id, lines, total, shipping_address))
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, %owner_id, "order created");
        Ok(order)
    }

    /// Settles a pending order: decrements stock for every line and
    /// moves the order to `Paid`.
    ///
    /// Availability is pre-checked for all lines before any decrement
    /// is committed, so a shortfall found during pre-flight mutates
    /// nothing. Returns the new status.
    #[tracing::instrument(skip(self))]
    pub async fn settle_order(&self, order_id: OrderId) -> Result<OrderStatus> {
        let start = std::time::Instant::now();

        let mut order = self.store.get(order_id).await?;
        if !order.status.can_settle() {
            return Err(EngineError::InvalidState {
                order_id,
                status: order.status,
                action: "settle",
            });
        }

        for line in &order.lines {
            let snapshot = self.inventory.get_available(&line.product_id).await?;
            if snapshot.available < line.quantity {
                return Err(EngineError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    available: snapshot.available,
                });
            }
        }

        for line in &order.lines {
            self.inventory
                .decrement(&line.product_id, line.quantity)
                .await?;
        }

        order.status = OrderStatus::Paid;
        order.updated_at = Utc::now();
        self.store.update(&order).await?;

        metrics::counter!("orders_settled_total").increment(1);
        metrics::histogram!("order_settlement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(%order_id, "order settled");
        Ok(order.status)
    }

    /// Retrieves an order by identifier.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        Ok(self.store.get(order_id).await?)
    }

    /// Retrieves an order, additionally checking that the caller owns it.
    pub async fn get_order_details(&self, order_id: OrderId, owner_id: UserId) -> Result<Order> {
        let order = self.store.get(order_id).await?;
        if order.owner_id != owner_id {
            return Err(EngineError::Unauthorized(order_id));
        }
        Ok(order)
    }

    /// Returns one page of an owner's orders in the given status, plus
    /// the total matching count.
    pub async fn list_user_orders(
        &self,
        owner_id: UserId,
        page: u32,
        page_size: u32,
        status: OrderStatus,
    ) -> Result<OrderPage> {
        Ok(self
            .store
            .list_paged(owner_id, page, page_size, status)
            .await?)
    }

    /// Administrative update: overwrites status and shipping address
    /// without transition validation.
    #[tracing::instrument(skip(self, new_address))]
    pub async fn update_order(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        new_address: impl Into<String>,
    ) -> Result<()> {
        let mut order = self.store.get(order_id).await?;
        order.status = new_status;
        order.shipping_address = new_address.into();
        order.updated_at = Utc::now();
        self.store.update(&order).await?;

        tracing::info!(%order_id, status = %new_status, "order updated");
        Ok(())
    }

    /// Cancels an order. Permitted only while the order is `Pending` or
    /// `Paid`; the reason is recorded for audit, not validated.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_order(&self, order_id: OrderId, reason: &str) -> Result<()> {
        let mut order = self.store.get(order_id).await?;
        if !order.status.can_cancel() {
            return Err(EngineError::InvalidState {
                order_id,
                status: order.status,
                action: "cancel",
            });
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.store.update(&order).await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, reason, "order cancelled");
        Ok(())
    }

    /// One auto-cancellation pass: cancels every pending order older
    /// than `pending_timeout`.
    ///
    /// The listing query already restricts to pending orders, so status
    /// is not re-validated. A failure to update one order is logged and
    /// does not affect the rest of the pass. Returns the number of
    /// orders cancelled.
    pub async fn sweep_once(&self, pending_timeout: Duration) -> Result<usize> {
        let expired = self.store.list_pending_older_than(pending_timeout).await?;

        let mut cancelled = 0;
        for mut order in expired {
            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();

            match self.store.update(&order).await {
                Ok(()) => {
                    cancelled += 1;
                    metrics::counter!("orders_auto_cancelled_total").increment(1);
                    tracing::info!(order_id = %order.id, "auto-cancelled order past pending timeout");
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "failed to auto-cancel order");
                }
            }
        }
        Ok(cancelled)
    }
}

impl<S, I> OrderEngine<S, I>
where
    S: OrderStore + Clone + 'static,
    I: InventoryPort + Clone + 'static,
{
    /// Spawns the recurring auto-cancellation sweep for this engine.
    pub fn spawn_sweep(&self, config: SweepConfig) -> SweepHandle {
        sweep::spawn(self.clone(), config)
    }
}
