//! Validated order request payloads.

use chrono::{DateTime, Utc};
use common::Order;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// Payload for creating a new order.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[validate(range(min = 1, message = "addressId is required"))]
    pub address_id: i64,
    #[serde(default)]
    pub note: String,
    #[validate(length(min = 1, message = "serviceType is required"))]
    pub service_type: String,
    #[validate(length(min = 1, message = "orderType is required"))]
    pub order_type: String,
    pub price: Option<Decimal>,
    pub collect_date: DateTime<Utc>,
    pub estimate_date: DateTime<Utc>,
}

/// Payload for editing a `created` order. Absent fields keep their
/// stored values.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub address_id: Option<i64>,
    pub note: Option<String>,
    #[validate(length(min = 1, message = "serviceType cannot be empty"))]
    pub service_type: Option<String>,
    #[validate(length(min = 1, message = "orderType cannot be empty"))]
    pub order_type: Option<String>,
    pub price: Option<Decimal>,
    pub collect_date: Option<DateTime<Utc>>,
    pub estimate_date: Option<DateTime<Utc>>,
}

impl OrderPatch {
    /// Applies the present fields onto the order.
    pub fn apply(&self, order: &mut Order) {
        if let Some(address_id) = self.address_id {
            order.address_id = address_id;
        }
        if let Some(ref note) = self.note {
            order.note = note.clone();
        }
        if let Some(ref service_type) = self.service_type {
            order.service_type = service_type.clone();
        }
        if let Some(ref order_type) = self.order_type {
            order.order_type = order_type.clone();
        }
        if let Some(price) = self.price {
            order.price = Some(price);
        }
        if let Some(collect_date) = self.collect_date {
            order.collect_date = collect_date;
        }
        if let Some(estimate_date) = self.estimate_date {
            order.estimate_date = estimate_date;
        }
    }
}

/// Payload for attaching a payment to an order.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[validate(length(min = 1, message = "transactionId is required"))]
    pub transaction_id: String,
}
