//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Paid ──► Shipped ──► Delivered
///    │          │
///    └──────────┴──► Cancelled
/// ```
///
/// `Delivered` and `Cancelled` are terminal. The integer discriminants
/// are the persisted representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order created, awaiting settlement.
    #[default]
    Pending = 0,

    /// Payment settled, stock decremented.
    Paid = 1,

    /// Order handed to the carrier.
    Shipped = 2,

    /// Order received by the customer (terminal).
    Delivered = 3,

    /// Order was cancelled (terminal).
    Cancelled = 4,
}

impl OrderStatus {
    /// Returns true if the order can be settled in this status.
    pub fn can_settle(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Returns the persisted integer representation.
    pub fn as_i16(&self) -> i16 {
        *self as i16
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = InvalidOrderStatus;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Paid),
            2 => Ok(OrderStatus::Shipped),
            3 => Ok(OrderStatus::Delivered),
            4 => Ok(OrderStatus::Cancelled),
            other => Err(InvalidOrderStatus(other.to_string())),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InvalidOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(InvalidOrderStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown order status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOrderStatus(pub String);

impl std::fmt::Display for InvalidOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid order status: {}", self.0)
    }
}

impl std::error::Error for InvalidOrderStatus {}
