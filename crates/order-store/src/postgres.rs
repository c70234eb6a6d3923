use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{Money, OrderId, UserId};

use crate::{
    NewOrder, Order, OrderLine, OrderStatus, OrderStoreError, Result,
    store::{OrderPage, OrderStore, page_offset},
};

/// PostgreSQL-backed order store implementation.
///
/// Each order is one row with its lines embedded as JSONB, so every
/// create/update is a single-statement atomic write.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let lines_json: serde_json::Value = row.try_get("lines")?;
        let lines: Vec<OrderLine> = serde_json::from_value(lines_json)?;
        let status = OrderStatus::try_from(row.try_get::<i16, _>("status")?)
            .map_err(|e| OrderStoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            owner_id: UserId::from_uuid(row.try_get::<Uuid, _>("owner_id")?),
            lines,
            total: Money::from_cents(row.try_get("total_cents")?),
            status,
            shipping_address: row.try_get("shipping_address")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let order = order.into_order(OrderId::new());
        let lines_json = serde_json::to_value(&order.lines)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.owner_id.as_uuid())
        .bind(lines_json)
        .bind(order.total.cents())
        .bind(order.status.as_i16())
        .bind(&order.shipping_address)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(OrderStoreError::NotFound(id)),
        }
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let lines_json = serde_json::to_value(&order.lines)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, shipping_address = $3, lines = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_i16())
        .bind(&order.shipping_address)
        .bind(lines_json)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrderStoreError::NotFound(order.id));
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner_id: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at
                    FROM orders
                    WHERE owner_id = $1 AND status = $2
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(owner_id.as_uuid())
                .bind(status.as_i16())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at
                    FROM orders
                    WHERE owner_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(owner_id.as_uuid())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_pending_older_than(&self, older_than: Duration) -> Result<Vec<Order>> {
        let cutoff = Utc::now() - older_than;

        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at
            FROM orders
            WHERE status = $1 AND created_at < $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(OrderStatus::Pending.as_i16())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(count = rows.len(), "expired pending orders fetched");
        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_paged(
        &self,
        owner_id: UserId,
        page: u32,
        page_size: u32,
        status: OrderStatus,
    ) -> Result<OrderPage> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE owner_id = $1 AND status = $2")
                .bind(owner_id.as_uuid())
                .bind(status.as_i16())
                .fetch_one(&self.pool)
                .await?;

        if total == 0 {
            return Ok(OrderPage {
                orders: Vec::new(),
                total: 0,
            });
        }

        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, lines, total_cents, status, shipping_address, created_at, updated_at
            FROM orders
            WHERE owner_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner_id.as_uuid())
        .bind(status.as_i16())
        .bind(page_size as i64)
        .bind(page_offset(page, page_size) as i64)
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            total: total as u64,
        })
    }
}
