//! PostgreSQL integration tests for the order store.
//!
//! These tests share one PostgreSQL container and run serially because
//! each test truncates the orders table for isolation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{Money, UserId};
use order_store::{
    NewOrder, OrderId, OrderLine, OrderStatus, OrderStore, OrderStoreError, PostgresOrderStore,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for schema setup
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn widget_order(owner_id: UserId) -> NewOrder {
    NewOrder::pending(
        owner_id,
        vec![OrderLine::new(
            "SKU-001",
            "Widget",
            2,
            Money::from_cents(9999),
        )],
        Money::from_cents(19998),
        "10 Main St",
    )
}

#[tokio::test]
#[serial]
async fn create_and_get_roundtrip() {
    let store = get_test_store().await;
    let owner = UserId::new();

    let created = store.create(widget_order(owner)).await.unwrap();
    let fetched = store.get(created.id).await.unwrap();

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.owner_id, owner);
    assert_eq!(fetched.status, OrderStatus::Pending);
    assert_eq!(fetched.total.cents(), 19998);
    assert_eq!(fetched.lines.len(), 1);
    assert_eq!(fetched.lines[0].product_name, "Widget");
    assert_eq!(fetched.lines[0].quantity, 2);
}

#[tokio::test]
#[serial]
async fn get_missing_order_fails_not_found() {
    let store = get_test_store().await;

    let result = store.get(OrderId::new()).await;
    assert!(matches!(result, Err(OrderStoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn update_overwrites_status_address_lines_and_timestamp() {
    let store = get_test_store().await;
    let mut order = store.create(widget_order(UserId::new())).await.unwrap();

    order.status = OrderStatus::Paid;
    order.shipping_address = "22 Oak Ave".to_string();
    order.lines.push(OrderLine::new(
        "SKU-002",
        "Gadget",
        1,
        Money::from_cents(2500),
    ));
    order.updated_at = Utc::now();
    store.update(&order).await.unwrap();

    let fetched = store.get(order.id).await.unwrap();
    assert_eq!(fetched.status, OrderStatus::Paid);
    assert_eq!(fetched.shipping_address, "22 Oak Ave");
    assert_eq!(fetched.lines.len(), 2);
    // Creation metadata is untouched by updates.
    assert_eq!(fetched.created_at, order.created_at);
    assert_eq!(fetched.total.cents(), 19998);
}

#[tokio::test]
#[serial]
async fn update_missing_order_fails_not_found() {
    let store = get_test_store().await;
    let order = widget_order(UserId::new()).into_order(OrderId::new());

    let result = store.update(&order).await;
    assert!(matches!(result, Err(OrderStoreError::NotFound(_))));
}

#[tokio::test]
#[serial]
async fn list_by_owner_filters_and_sorts_newest_first() {
    let store = get_test_store().await;
    let owner = UserId::new();
    let other = UserId::new();

    let mut first = widget_order(owner);
    first.created_at = Utc::now() - Duration::minutes(2);
    let first = store.create(first).await.unwrap();
    let second = store.create(widget_order(owner)).await.unwrap();
    store.create(widget_order(other)).await.unwrap();

    let all = store.list_by_owner(owner, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);
    assert_eq!(all[1].id, first.id);

    let mut paid = store.get(first.id).await.unwrap();
    paid.status = OrderStatus::Paid;
    store.update(&paid).await.unwrap();

    let paid_only = store
        .list_by_owner(owner, Some(OrderStatus::Paid))
        .await
        .unwrap();
    assert_eq!(paid_only.len(), 1);
    assert_eq!(paid_only[0].id, first.id);
}

#[tokio::test]
#[serial]
async fn list_pending_older_than_returns_only_expired_pending() {
    let store = get_test_store().await;
    let owner = UserId::new();

    let mut stale = widget_order(owner);
    stale.created_at = Utc::now() - Duration::minutes(35);
    let stale = store.create(stale).await.unwrap();

    let mut stale_paid = widget_order(owner);
    stale_paid.created_at = Utc::now() - Duration::minutes(35);
    let mut stale_paid = store.create(stale_paid).await.unwrap();
    stale_paid.status = OrderStatus::Paid;
    store.update(&stale_paid).await.unwrap();

    let mut fresh = widget_order(owner);
    fresh.created_at = Utc::now() - Duration::minutes(10);
    store.create(fresh).await.unwrap();

    let expired = store
        .list_pending_older_than(Duration::minutes(30))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
}

#[tokio::test]
#[serial]
async fn list_paged_returns_pages_and_total() {
    let store = get_test_store().await;
    let owner = UserId::new();

    for i in 0..5 {
        let mut order = widget_order(owner);
        order.created_at = Utc::now() - Duration::minutes(i);
        store.create(order).await.unwrap();
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

    let empty = store
        .list_paged(owner, 1, 10, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(empty.orders.is_empty());
    assert_eq!(empty.total, 0);
}
