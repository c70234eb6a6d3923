//! Inventory port: read and conditionally decrement product stock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use thiserror::Error;

use common::{Money, ProductId};

/// Point-in-time view of a product's availability.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    /// The product identifier.
    pub product_id: ProductId,
    /// Product name at read time.
    pub name: String,
    /// Current unit price.
    pub unit_price: Money,
    /// Units currently available.
    pub available: u32,
}

/// Errors that can occur when interacting with the inventory port.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The requested decrement exceeds current availability.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The inventory backend is unavailable.
    #[error("Inventory backend unavailable: {0}")]
    Unavailable(String),
}

/// Trait for inventory access during settlement.
///
/// `decrement` must be atomic per product: the availability check and
/// the decrement happen without an intervening external mutation. This
/// is a contractual requirement on implementations; the engine does not
/// re-verify it.
#[async_trait]
pub trait InventoryPort: Send + Sync {
    /// Reads a product's current availability and snapshot data.
    async fn get_available(&self, product_id: &ProductId)
    -> Result<ProductSnapshot, InventoryError>;

    /// Decrements a product's available quantity by `amount`.
    ///
    /// Fails with `InsufficientStock` (and mutates nothing) when fewer
    /// than `amount` units are available.
    async fn decrement(&self, product_id: &ProductId, amount: u32) -> Result<(), InventoryError>;
}

#[derive(Debug, Clone)]
struct ProductRecord {
    name: String,
    unit_price: Money,
    stock: u32,
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    products: HashMap<ProductId, ProductRecord>,
    fail_on_decrement: bool,
}

/// In-memory inventory backend for tests and standalone deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new empty in-memory inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product with the given stock level.
    pub fn insert_product(
        &self,
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        stock: u32,
    ) {
        self.state.write().unwrap().products.insert(
            product_id.into(),
            ProductRecord {
                name: name.into(),
                unit_price,
                stock,
            },
        );
    }

    /// Returns the current stock for a product, if it exists.
    pub fn available(&self, product_id: &ProductId) -> Option<u32> {
        self.state
            .read()
            .unwrap()
            .products
            .get(product_id)
            .map(|p| p.stock)
    }

    /// Configures the backend to fail on the next decrement call.
    pub fn set_fail_on_decrement(&self, fail: bool) {
        self.state.write().unwrap().fail_on_decrement = fail;
    }
}

#[async_trait]
impl InventoryPort for InMemoryInventoryService {
    async fn get_available(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductSnapshot, InventoryError> {
        let state = self.state.read().unwrap();
        let record = state
            .products
            .get(product_id)
            .ok_or_else(|| InventoryError::ProductNotFound(product_id.clone()))?;

        Ok(ProductSnapshot {
            product_id: product_id.clone(),
            name: record.name.clone(),
            unit_price: record.unit_price,
            available: record.stock,
        })
    }

    async fn decrement(&self, product_id: &ProductId, amount: u32) -> Result<(), InventoryError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_decrement {
            return Err(InventoryError::Unavailable(
                "simulated backend failure".to_string(),
            ));
        }

        let record = state
            .products
            .get_mut(product_id)
            .ok_or_else(|| InventoryError::ProductNotFound(product_id.clone()))?;

        if record.stock < amount {
            return Err(InventoryError::InsufficientStock {
                product_id: product_id.clone(),
                requested: amount,
                available: record.stock,
            });
        }

        record.stock -= amount;
        Ok(())
    }
}

/// Inventory backend reading the products table directly.
///
/// Used by deployments that share a database with the product service
/// instead of calling it remotely. The conditional UPDATE makes the
/// check-then-decrement atomic per product.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new Postgres-backed inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds or replaces a product row with the given stock level.
    pub async fn upsert_product(
        &self,
        product_id: &ProductId,
        name: &str,
        unit_price: Money,
        stock: u32,
    ) -> Result<(), InventoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price_cents = EXCLUDED.price_cents,
                stock = EXCLUDED.stock,
                updated_at = now()
            "#,
        )
        .bind(product_id.as_str())
        .bind(name)
        .bind(unit_price.cents())
        .bind(stock as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl InventoryPort for PostgresInventoryStore {
    async fn get_available(
        &self,
        product_id: &ProductId,
    ) -> Result<ProductSnapshot, InventoryError> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(ProductSnapshot {
                product_id: ProductId::new(row.try_get::<String, _>("id")?),
                name: row.try_get("name")?,
                unit_price: Money::from_cents(row.try_get("price_cents")?),
                available: row.try_get::<i32, _>("stock")? as u32,
            }),
            None => Err(InventoryError::ProductNotFound(product_id.clone())),
        }
    }

    async fn decrement(&self, product_id: &ProductId, amount: u32) -> Result<(), InventoryError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(product_id.as_str())
        .bind(amount as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Zero rows: either the product is missing or stock is short.
        let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match stock {
            Some(available) => Err(InventoryError::InsufficientStock {
                product_id: product_id.clone(),
                requested: amount,
                available: available as u32,
            }),
            None => Err(InventoryError::ProductNotFound(product_id.clone())),
        }
    }
}
