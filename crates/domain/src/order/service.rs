//! Order lifecycle manager.
//!
//! Every transition reads the stored order, checks the status guard
//! against what is actually stored, then writes through the store's
//! compare-and-swap. Terminal transitions archive instead of updating:
//! the order is copied to history and removed from the active table in
//! one atomic step.

use chrono::Utc;
use common::{History, Order, OrderId, OrderStatus, Version};
use store::{OrderQuery, OrderStore, StoreError};
use validator::Validate;

use crate::error::OrderError;

use super::{Caller, OrderDraft, OrderPatch, PaymentRequest};

/// Prefix for generated order ids.
const ORDER_ID_PREFIX: &str = "ORD";

/// How many times creation retries on an id collision.
const ID_RETRIES: usize = 3;

/// Service for managing the order lifecycle.
pub struct OrderService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a new order for the caller.
    ///
    /// The order starts in `created` status with no weight and no
    /// payment. Id collisions are retried a few times before the
    /// duplicate error surfaces.
    #[tracing::instrument(skip(self, draft))]
    pub async fn create_order(&self, caller: Caller, draft: OrderDraft) -> Result<Order, OrderError> {
        draft
            .validate()
            .map_err(|e| OrderError::InvalidInput(e.to_string()))?;

        let mut attempts = 0;
        loop {
            let now = Utc::now();
            let order = Order {
                id: OrderId::generate(ORDER_ID_PREFIX),
                user_id: caller.user_id,
                transaction_id: None,
                address_id: draft.address_id,
                status: OrderStatus::Created,
                note: draft.note.clone(),
                service_type: draft.service_type.clone(),
                order_type: draft.order_type.clone(),
                weight: None,
                price: draft.price,
                collect_date: draft.collect_date,
                estimate_date: draft.estimate_date,
                created_at: now,
                updated_at: now,
                version: Version::first(),
            };

            match self.store.insert_order(order).await {
                Ok(stored) => {
                    metrics::counter!("orders_created_total").increment(1);
                    return Ok(stored);
                }
                Err(StoreError::Duplicate(id)) if attempts < ID_RETRIES => {
                    attempts += 1;
                    tracing::warn!(%id, attempts, "order id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fetches an order. Customers only see their own; admins see all.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, caller: Caller, id: &OrderId) -> Result<Order, OrderError> {
        let order = self.load(id).await?;
        if !caller.is_admin() && !caller.owns(&order) {
            return Err(OrderError::OwnershipMismatch {
                id: id.clone(),
                caller: caller.user_id,
            });
        }
        Ok(order)
    }

    /// Lists active orders, newest first. Customers are restricted to
    /// their own orders regardless of the query's filter.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_orders(&self, caller: Caller, query: OrderQuery) -> Result<Vec<Order>, OrderError> {
        let query = if caller.is_admin() {
            query
        } else {
            query.for_user(caller.user_id)
        };
        Ok(self.store.list_orders(query).await?)
    }

    /// Edits a `created` order's descriptive fields.
    #[tracing::instrument(skip(self, patch))]
    pub async fn edit_order(
        &self,
        caller: Caller,
        id: &OrderId,
        patch: OrderPatch,
    ) -> Result<Order, OrderError> {
        patch
            .validate()
            .map_err(|e| OrderError::InvalidInput(e.to_string()))?;

        let mut order = self.load_owned(caller, id).await?;
        if !order.status.can_edit() {
            return Err(OrderError::InvalidTransition {
                status: order.status,
                action: "edit",
            });
        }
        patch.apply(&mut order);
        Ok(self.store.update_order(&order).await?)
    }

    /// Cancels a `created` order: archives it with reason `cancelled`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, caller: Caller, id: &OrderId) -> Result<History, OrderError> {
        let order = self.load_owned(caller, id).await?;
        if !order.status.can_cancel() {
            return Err(OrderError::InvalidTransition {
                status: order.status,
                action: "cancel",
            });
        }
        self.archive(&order, Some("cancelled")).await
    }

    /// Accepts a `created` order, moving it to `accepted`.
    #[tracing::instrument(skip(self))]
    pub async fn accept_order(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.transition(id, "accept", OrderStatus::can_accept, OrderStatus::Accepted)
            .await
    }

    /// Rejects a `created` order: archives it with reason `rejected`.
    #[tracing::instrument(skip(self))]
    pub async fn reject_order(&self, id: &OrderId) -> Result<History, OrderError> {
        let order = self.load(id).await?;
        if !order.status.can_reject() {
            return Err(OrderError::InvalidTransition {
                status: order.status,
                action: "reject",
            });
        }
        self.archive(&order, Some("rejected")).await
    }

    /// Marks an `accepted` order as `delivered`.
    #[tracing::instrument(skip(self))]
    pub async fn deliver_order(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.transition(id, "deliver", OrderStatus::can_deliver, OrderStatus::Delivered)
            .await
    }

    /// Records the measured weight for an order.
    ///
    /// The raw value comes straight from the request form; it must
    /// parse as a finite, non-negative number.
    #[tracing::instrument(skip(self))]
    pub async fn update_weight(&self, id: &OrderId, raw: &str) -> Result<Order, OrderError> {
        let weight: f64 = raw
            .trim()
            .parse()
            .map_err(|_| OrderError::InvalidInput(format!("invalid weight: {raw}")))?;
        if !weight.is_finite() || weight < 0.0 {
            return Err(OrderError::InvalidInput(format!("invalid weight: {raw}")));
        }

        let mut order = self.load(id).await?;
        order.weight = Some(weight);
        Ok(self.store.update_order(&order).await?)
    }

    /// Attaches a payment transaction reference to an order.
    ///
    /// The order must be priced first; unpriced orders cannot be paid.
    #[tracing::instrument(skip(self, payment))]
    pub async fn pay_order(
        &self,
        caller: Caller,
        id: &OrderId,
        payment: PaymentRequest,
    ) -> Result<Order, OrderError> {
        payment
            .validate()
            .map_err(|e| OrderError::InvalidInput(e.to_string()))?;

        let mut order = self.load_owned(caller, id).await?;
        if order.price.is_none() {
            return Err(OrderError::PaymentNotAllowed);
        }
        order.transaction_id = Some(payment.transaction_id);
        Ok(self.store.update_order(&order).await?)
    }

    /// Completes a `delivered` order: archives it with no reason.
    ///
    /// Requires ownership, `delivered` status and a recorded payment
    /// transaction, checked in that order.
    #[tracing::instrument(skip(self))]
    pub async fn complete_order(&self, caller: Caller, id: &OrderId) -> Result<History, OrderError> {
        let mut order = self.load_owned(caller, id).await?;
        if !order.status.can_complete() {
            return Err(OrderError::InvalidTransition {
                status: order.status,
                action: "complete",
            });
        }
        if order
            .transaction_id
            .as_deref()
            .is_none_or(|t| t.is_empty())
        {
            return Err(OrderError::MissingTransaction);
        }
        order.status = OrderStatus::Completed;
        self.archive(&order, None).await
    }

    /// Fetches a history row. Customers only see their own.
    #[tracing::instrument(skip(self))]
    pub async fn get_history(&self, caller: Caller, id: &OrderId) -> Result<History, OrderError> {
        let history = self
            .store
            .get_history(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.clone()))?;
        if !caller.is_admin() && caller.user_id != history.user_id {
            return Err(OrderError::OwnershipMismatch {
                id: id.clone(),
                caller: caller.user_id,
            });
        }
        Ok(history)
    }

    /// Lists history rows, newest archival first. Customers are
    /// restricted to their own history.
    #[tracing::instrument(skip(self, query))]
    pub async fn list_history(
        &self,
        caller: Caller,
        query: OrderQuery,
    ) -> Result<Vec<History>, OrderError> {
        let query = if caller.is_admin() {
            query
        } else {
            query.for_user(caller.user_id)
        };
        Ok(self.store.list_history(query).await?)
    }

    async fn load(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.clone()))
    }

    async fn load_owned(&self, caller: Caller, id: &OrderId) -> Result<Order, OrderError> {
        let order = self.load(id).await?;
        if !caller.owns(&order) {
            return Err(OrderError::OwnershipMismatch {
                id: id.clone(),
                caller: caller.user_id,
            });
        }
        Ok(order)
    }

    async fn transition(
        &self,
        id: &OrderId,
        action: &'static str,
        guard: fn(&OrderStatus) -> bool,
        to: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut order = self.load(id).await?;
        if !guard(&order.status) {
            return Err(OrderError::InvalidTransition {
                status: order.status,
                action,
            });
        }
        order.status = to;
        let stored = self.store.update_order(&order).await?;
        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
        Ok(stored)
    }

    async fn archive(&self, order: &Order, reason: Option<&str>) -> Result<History, OrderError> {
        let history = History::from_order(order, reason.map(String::from), Utc::now());
        self.store.archive_order(order, history.clone()).await?;
        metrics::counter!(
            "orders_archived_total",
            "reason" => reason.unwrap_or("completed").to_string()
        )
        .increment(1);
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;
    use rust_decimal::Decimal;
    use store::InMemoryStore;

    fn draft() -> OrderDraft {
        OrderDraft {
            address_id: 1,
            note: "ring the bell".to_string(),
            service_type: "wash".to_string(),
            order_type: "regular".to_string(),
            price: None,
            collect_date: Utc::now(),
            estimate_date: Utc::now(),
        }
    }

    fn priced_draft() -> OrderDraft {
        OrderDraft {
            price: Some(Decimal::new(5000, 2)),
            ..draft()
        }
    }

    fn service() -> OrderService<InMemoryStore> {
        OrderService::new(InMemoryStore::new())
    }

    async fn delivered_order(service: &OrderService<InMemoryStore>, owner: Caller) -> Order {
        let order = service.create_order(owner, priced_draft()).await.unwrap();
        service.accept_order(&order.id).await.unwrap();
        service.deliver_order(&order.id).await.unwrap()
    }

    #[tokio::test]
    async fn create_order_starts_in_created_status() {
        let service = service();
        let caller = Caller::customer(UserId::new(1));

        let order = service.create_order(caller, draft()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.id.as_str().starts_with("ORD"));
        assert_eq!(order.user_id, caller.user_id);
        assert!(order.weight.is_none());
        assert!(order.transaction_id.is_none());
    }

    #[tokio::test]
    async fn create_order_rejects_invalid_draft() {
        let service = service();
        let caller = Caller::customer(UserId::new(1));

        let mut bad = draft();
        bad.service_type = String::new();

        let err = service.create_order(caller, bad).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_order_enforces_ownership() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));
        let stranger = Caller::customer(UserId::new(2));
        let admin = Caller::admin(UserId::new(99));

        let order = service.create_order(owner, draft()).await.unwrap();

        assert!(service.get_order(owner, &order.id).await.is_ok());
        assert!(service.get_order(admin, &order.id).await.is_ok());
        let err = service.get_order(stranger, &order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn get_order_unknown_id_is_not_found() {
        let service = service();
        let caller = Caller::customer(UserId::new(1));

        let err = service
            .get_order(caller, &OrderId::new("ORDmissing"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn edit_order_only_while_created() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();
        let patch = OrderPatch {
            note: Some("leave at the door".to_string()),
            ..Default::default()
        };

        let edited = service
            .edit_order(owner, &order.id, patch.clone())
            .await
            .unwrap();
        assert_eq!(edited.note, "leave at the door");

        service.accept_order(&order.id).await.unwrap();
        let err = service.edit_order(owner, &order.id, patch).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                status: OrderStatus::Accepted,
                action: "edit",
            }
        ));
    }

    #[tokio::test]
    async fn cancel_archives_with_reason() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();
        let history = service.cancel_order(owner, &order.id).await.unwrap();

        assert_eq!(history.reason.as_deref(), Some("cancelled"));
        assert_eq!(history.status, OrderStatus::Created);
        let err = service.get_order(owner, &order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_requires_created_status() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();
        service.accept_order(&order.id).await.unwrap();

        let err = service.cancel_order(owner, &order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn reject_archives_with_reason() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();
        let history = service.reject_order(&order.id).await.unwrap();

        assert_eq!(history.reason.as_deref(), Some("rejected"));
        assert_eq!(history.status, OrderStatus::Created);
    }

    #[tokio::test]
    async fn accept_then_deliver_follows_the_machine() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();

        let accepted = service.accept_order(&order.id).await.unwrap();
        assert_eq!(accepted.status, OrderStatus::Accepted);

        let err = service.accept_order(&order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let delivered = service.deliver_order(&order.id).await.unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn deliver_requires_accepted_status() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();
        let err = service.deliver_order(&order.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                status: OrderStatus::Created,
                action: "deliver",
            }
        ));
    }

    #[tokio::test]
    async fn update_weight_parses_and_validates() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();

        let updated = service.update_weight(&order.id, "3.5").await.unwrap();
        assert_eq!(updated.weight, Some(3.5));

        for raw in ["abc", "NaN", "inf", "-1"] {
            let err = service.update_weight(&order.id, raw).await.unwrap_err();
            assert!(matches!(err, OrderError::InvalidInput(_)), "raw={raw}");
        }
    }

    #[tokio::test]
    async fn pay_order_requires_a_price() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let unpriced = service.create_order(owner, draft()).await.unwrap();
        let err = service
            .pay_order(
                owner,
                &unpriced.id,
                PaymentRequest {
                    transaction_id: "TX1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::PaymentNotAllowed));

        let priced = service.create_order(owner, priced_draft()).await.unwrap();
        let paid = service
            .pay_order(
                owner,
                &priced.id,
                PaymentRequest {
                    transaction_id: "TX1".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(paid.transaction_id.as_deref(), Some("TX1"));
    }

    #[tokio::test]
    async fn complete_requires_delivered_status() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, priced_draft()).await.unwrap();
        let err = service.complete_order(owner, &order.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                status: OrderStatus::Created,
                action: "complete",
            }
        ));
    }

    #[tokio::test]
    async fn complete_requires_a_transaction() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = delivered_order(&service, owner).await;
        let err = service.complete_order(owner, &order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::MissingTransaction));
    }

    #[tokio::test]
    async fn complete_archives_as_completed_without_reason() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));

        let order = delivered_order(&service, owner).await;
        service
            .pay_order(
                owner,
                &order.id,
                PaymentRequest {
                    transaction_id: "TX1".to_string(),
                },
            )
            .await
            .unwrap();

        let history = service.complete_order(owner, &order.id).await.unwrap();

        assert_eq!(history.status, OrderStatus::Completed);
        assert!(history.reason.is_none());
        assert_eq!(history.transaction_id.as_deref(), Some("TX1"));

        let fetched = service.get_history(owner, &order.id).await.unwrap();
        assert_eq!(fetched.id, order.id);
    }

    #[tokio::test]
    async fn complete_checks_ownership_before_status() {
        let service = service();
        let owner = Caller::customer(UserId::new(1));
        let stranger = Caller::customer(UserId::new(2));

        let order = service.create_order(owner, draft()).await.unwrap();
        let err = service.complete_order(stranger, &order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn listing_scopes_customers_to_their_own_orders() {
        let service = service();
        let alice = Caller::customer(UserId::new(1));
        let bob = Caller::customer(UserId::new(2));
        let admin = Caller::admin(UserId::new(99));

        service.create_order(alice, draft()).await.unwrap();
        service.create_order(bob, draft()).await.unwrap();

        let mine = service.list_orders(alice, OrderQuery::new()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, alice.user_id);

        let all = service.list_orders(admin, OrderQuery::new()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn history_listing_scopes_customers() {
        let service = service();
        let alice = Caller::customer(UserId::new(1));
        let bob = Caller::customer(UserId::new(2));

        let a = service.create_order(alice, draft()).await.unwrap();
        let b = service.create_order(bob, draft()).await.unwrap();
        service.cancel_order(alice, &a.id).await.unwrap();
        service.cancel_order(bob, &b.id).await.unwrap();

        let mine = service.list_history(alice, OrderQuery::new()).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, alice.user_id);

        let err = service.get_history(bob, &a.id).await.unwrap_err();
        assert!(matches!(err, OrderError::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn concurrent_transitions_settle_to_exactly_one_winner() {
        let service = std::sync::Arc::new(service());
        let owner = Caller::customer(UserId::new(1));

        let order = service.create_order(owner, draft()).await.unwrap();

        let s1 = service.clone();
        let s2 = service.clone();
        let id1 = order.id.clone();
        let id2 = order.id.clone();
        let (cancel, accept) = tokio::join!(
            async move { s1.cancel_order(owner, &id1).await.map(|_| ()) },
            async move { s2.accept_order(&id2).await.map(|_| ()) },
        );

        assert!(
            cancel.is_ok() ^ accept.is_ok(),
            "exactly one of the competing transitions must win: cancel={cancel:?} accept={accept:?}"
        );
    }
}
