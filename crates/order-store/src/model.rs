//! Persisted order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{Money, OrderId, ProductId, UserId};

use crate::status::OrderStatus;

/// A line item within an order.
///
/// Product name and unit price are snapshots taken at order time; later
/// product changes do not retroactively affect existing orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The product identifier.
    pub product_id: ProductId,

    /// Human-readable product name at order time.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at order time.
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier.
    pub id: OrderId,

    /// The user who placed the order.
    pub owner_id: UserId,

    /// Ordered line items.
    pub lines: Vec<OrderLine>,

    /// Total amount charged for the order.
    pub total: Money,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Free-text shipping address.
    pub shipping_address: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the sum of all line totals.
    pub fn lines_total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}

/// An order that has not yet been assigned an identifier.
///
/// The store's `create` operation assigns the identifier and returns
/// the persisted [`Order`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner_id: UserId,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewOrder {
    /// Creates a pending order stamped with the current time.
    pub fn pending(
        owner_id: UserId,
        lines: Vec<OrderLine>,
        total: Money,
        shipping_address: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            owner_id,
            lines,
            total,
            status: OrderStatus::Pending,
            shipping_address: shipping_address.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Converts into a persisted order with the given identifier.
    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            owner_id: self.owner_id,
            lines: self.lines,
            total: self.total,
            status: self.status,
            shipping_address: self.shipping_address,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
