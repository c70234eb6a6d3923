use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use common::{OrderId, UserId};

use crate::{
    NewOrder, Order, OrderStatus, OrderStoreError, Result,
    store::{OrderPage, OrderStore, page_offset},
};

/// In-memory order store implementation.
///
/// Used by unit tests and standalone deployments. Provides the same
/// interface and ordering guarantees as the Postgres implementation.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let order = order.into_order(OrderId::new());
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Order> {
        self.orders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(OrderStoreError::NotFound(id))
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or(OrderStoreError::NotFound(order.id))?;

        stored.status = order.status;
        stored.shipping_address = order.shipping_address.clone();
        stored.lines = order.lines.clone();
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.owner_id == owner_id && status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_pending_older_than(&self, older_than: Duration) -> Result<Vec<Order>> {
        let cutoff = Utc::now() - older_than;
        let orders = self.orders.read().await;
        let mut expired: Vec<Order> = orders
            .values()
            .filter(|o| o.status == OrderStatus::Pending && o.created_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(expired)
    }

    async fn list_paged(
        &self,
        owner_id: UserId,
        page: u32,
        page_size: u32,
        status: OrderStatus,
    ) -> Result<OrderPage> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| o.owner_id == owner_id && o.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = page_offset(page, page_size) as usize;
        let orders = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(OrderPage { orders, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use crate::OrderLine;

    fn new_order(owner_id: UserId) -> NewOrder {
        NewOrder::pending(
            owner_id,
            vec![OrderLine::new("SKU-001", "Widget", 2, Money::from_cents(9999))],
            Money::from_cents(19998),
            "10 Main St",
        )
    }

    #[tokio::test]
    async fn test_create_assigns_identifier() {
        let store = InMemoryOrderStore::new();
        let owner = UserId::new();

        let a = store.create(new_order(owner)).await.unwrap();
        let b = store.create(new_order(owner)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_get_returns_created_order() {
        let store = InMemoryOrderStore::new();
        let created = store.create(new_order(UserId::new())).await.unwrap();

        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_order_fails() {
        let store = InMemoryOrderStore::new();
        let result = store.get(OrderId::new()).await;
        assert!(matches!(result, Err(OrderStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_overwrites_mutable_fields() {
        let store = InMemoryOrderStore::new();
        let mut order = store.create(new_order(UserId::new())).await.unwrap();

        order.status = OrderStatus::Paid;
        order.shipping_address = "22 Oak Ave".to_string();
        order.updated_at = Utc::now();
        store.update(&order).await.unwrap();

        let fetched = store.get(order.id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Paid);
        assert_eq!(fetched.shipping_address, "22 Oak Ave");
        assert_eq!(fetched.created_at, order.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_order_fails() {
        let store = InMemoryOrderStore::new();
        let order = new_order(UserId::new()).into_order(OrderId::new());
        let result = store.update(&order).await;
        assert!(matches!(result, Err(OrderStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_owner_filters_owner_and_status() {
        let store = InMemoryOrderStore::new();
        let owner = UserId::new();
        let other = UserId::new();

        let mut paid = store.create(new_order(owner)).await.unwrap();
        paid.status = OrderStatus::Paid;
        store.update(&paid).await.unwrap();
        store.create(new_order(owner)).await.unwrap();
        store.create(new_order(other)).await.unwrap();

        let all = store.list_by_owner(owner, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let paid_only = store
            .list_by_owner(owner, Some(OrderStatus::Paid))
            .await
            .unwrap();
        assert_eq!(paid_only.len(), 1);
        assert_eq!(paid_only[0].id, paid.id);
    }

    #[tokio::test]
    async fn test_list_pending_older_than_respects_cutoff() {
        let store = InMemoryOrderStore::new();
        let owner = UserId::new();

        let mut stale = new_order(owner);
        stale.created_at = Utc::now() - Duration::minutes(35);
        store.create(stale).await.unwrap();
        store.create(new_order(owner)).await.unwrap();

        let expired = store
            .list_pending_older_than(Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
    }

    #[tokio::test]
    async fn test_list_pending_older_than_skips_settled_orders() {
        let store = InMemoryOrderStore::new();

        let mut stale = new_order(UserId::new());
        stale.created_at = Utc::now() - Duration::minutes(35);
        let mut order = store.create(stale).await.unwrap();
        order.status = OrderStatus::Paid;
        store.update(&order).await.unwrap();

        let expired = store
            .list_pending_older_than(Duration::minutes(30))
            .await
            .unwrap();
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn test_list_paged_returns_page_and_total() {
        let store = InMemoryOrderStore::new();
        let owner = UserId::new();

        for _ in 0..5 {
            store.create(new_order(owner)).await.unwrap();
        }

        let page1 = store
            .list_paged(owner, 1, 2, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(page1.orders.len(), 2);
        assert_eq!(page1.total, 5);

        let page3 = store
            .list_paged(owner, 3, 2, OrderStatus::Pending)
            .await
            .unwrap();
        assert_eq!(page3.orders.len(), 1);
        assert_eq!(page3.total, 5);

        let page4 = store
            .list_paged(owner, 4, 2, OrderStatus::Pending)
            .await
            .unwrap();
        assert!(page4.orders.is_empty());
        assert_eq!(page4.total, 5);
    }
}
