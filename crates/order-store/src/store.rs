use async_trait::async_trait;
use chrono::Duration;

use common::{OrderId, UserId};

use crate::{NewOrder, Order, OrderStatus, Result};

/// One page of an owner's orders plus the total matching count.
#[derive(Debug, Clone)]
pub struct OrderPage {
    /// The orders on this page, newest first.
    pub orders: Vec<Order>,

    /// Total number of orders matching the filter, across all pages.
    pub total: u64,
}

/// Core trait for order store implementations.
///
/// The store is the single source of truth for persisted order state.
/// Multi-row writes (an order and its lines) are atomic: either all
/// commit or none do. All implementations must be thread-safe.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order, assigning its identifier.
    ///
    /// The order and its lines are written as one atomic unit; lines are
    /// never silently dropped. Returns the persisted order.
    async fn create(&self, order: NewOrder) -> Result<Order>;

    /// Retrieves an order and its lines by identifier.
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn get(&self, id: OrderId) -> Result<Order>;

    /// Overwrites status, shipping address, lines, and update timestamp
    /// for an existing order.
    ///
    /// Fails with `NotFound` if the identifier does not exist.
    async fn update(&self, order: &Order) -> Result<()>;

    /// Returns all orders for an owner, optionally restricted to one
    /// status. Ordered by creation time, newest first.
    async fn list_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;

    /// Returns all pending orders older than the given duration.
    ///
    /// Used by the auto-cancellation sweep.
    async fn list_pending_older_than(&self, older_than: Duration) -> Result<Vec<Order>>;

    /// Returns one page of an owner's orders restricted to one status,
    /// plus the total matching count. Pages are 1-based; newest first.
    async fn list_paged(
        &self,
        owner_id: UserId,
        page: u32,
        page_size: u32,
        status: OrderStatus,
    ) -> Result<OrderPage>;
}

/// Computes the row offset for a 1-based page number.
///
/// Page numbers below 1 clamp to the first page.
pub fn page_offset(page: u32, page_size: u32) -> u64 {
    page.saturating_sub(1) as u64 * page_size as u64
}
