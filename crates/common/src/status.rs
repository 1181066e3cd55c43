//! Order status machine and user roles.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// created ──┬──► accepted ──► delivered ──► completed
///           │
///           └──► cancelled / rejected
/// ```
///
/// Terminal statuses are never stored on an active order: the order is
/// copied to history and deleted instead (archive-on-terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by a customer, awaiting admin review.
    #[default]
    Created,

    /// Accepted by an admin, laundry in progress.
    Accepted,

    /// Laundry returned to the customer, awaiting confirmation.
    Delivered,

    /// Confirmed by the customer (terminal).
    Completed,

    /// Withdrawn by the owner while still `created` (terminal).
    Cancelled,

    /// Turned down by an admin while still `created` (terminal).
    Rejected,
}

impl OrderStatus {
    /// Returns true if the owner may still edit descriptive fields.
    pub fn can_edit(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the owner may cancel the order.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if an admin may accept the order.
    pub fn can_accept(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if an admin may reject the order.
    pub fn can_reject(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if an admin may mark the order delivered.
    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Accepted)
    }

    /// Returns true if the owner may complete the order.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status or role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError(pub String);

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown variant: {}", self.0)
    }
}

impl std::error::Error for ParseEnumError {}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "accepted" => Ok(OrderStatus::Accepted),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    /// Returns true for administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns the role name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}
