//! Persisted models.
//!
//! Field names serialize with the camelCase keys the public API and test
//! fixtures use. `version` is a storage concern and never serialized.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::{OrderStatus, Role};
use crate::types::{OrderId, UserId, Version};

/// An active laundry order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Payment reference, set once the order is paid.
    pub transaction_id: Option<String>,
    pub address_id: i64,
    pub status: OrderStatus,
    pub note: String,
    pub service_type: String,
    pub order_type: String,
    /// Measured by an admin after pickup; kilograms.
    pub weight: Option<f64>,
    pub price: Option<Decimal>,
    pub collect_date: DateTime<Utc>,
    pub estimate_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: Version,
}

/// Archived copy of a terminated order.
///
/// Append-only: created exactly once when an order leaves the active
/// table, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub id: OrderId,
    pub user_id: UserId,
    pub transaction_id: Option<String>,
    pub address_id: i64,
    pub status: OrderStatus,
    pub note: String,
    pub service_type: String,
    pub order_type: String,
    pub weight: Option<f64>,
    pub price: Option<Decimal>,
    /// Why the order left the active table; absent for normal completion.
    pub reason: Option<String>,
    pub collect_date: DateTime<Utc>,
    pub estimate_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

impl History {
    /// Builds the archive row for an order, field by field.
    pub fn from_order(order: &Order, reason: Option<String>, deleted_at: DateTime<Utc>) -> Self {
        Self {
            id: order.id.clone(),
            user_id: order.user_id,
            transaction_id: order.transaction_id.clone(),
            address_id: order.address_id,
            status: order.status,
            note: order.note.clone(),
            service_type: order.service_type.clone(),
            order_type: order.order_type.clone(),
            weight: order.weight,
            price: order.price,
            reason,
            collect_date: order.collect_date,
            estimate_date: order.estimate_date,
            created_at: order.created_at,
            updated_at: order.updated_at,
            deleted_at,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 hash, never the plaintext. Excluded from serialization.
    #[serde(skip)]
    pub password: String,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: Version,
}
