//! Engine error types.

use thiserror::Error;

use common::{OrderId, ProductId, UserId};
use order_store::{OrderStatus, OrderStoreError};

use crate::ports::inventory::InventoryError;

/// Errors that can occur during lifecycle operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The operation is not permitted from the order's current status.
    #[error("Cannot {action} order {order_id} in {status} status")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
        action: &'static str,
    },

    /// The owner could not be validated at creation time.
    #[error("Invalid owner: {0}")]
    InvalidOwner(UserId),

    /// The caller does not own the requested order.
    #[error("Unauthorized access to order {0}")]
    Unauthorized(OrderId),

    /// The order payload failed creation-time validation.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// A line's quantity exceeds the product's availability.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// An inventory port failure other than a stock shortfall.
    #[error("Inventory error: {0}")]
    Inventory(InventoryError),

    /// An order store failure other than a missing order.
    #[error("Order store error: {0}")]
    Store(OrderStoreError),
}

impl From<OrderStoreError> for EngineError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::NotFound(id) => EngineError::OrderNotFound(id),
            other => EngineError::Store(other),
        }
    }
}

impl From<InventoryError> for EngineError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => EngineError::Inventory(other),
        }
    }
}

/// Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, EngineError>;
