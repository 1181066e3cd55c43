use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{History, Order, OrderId, User, UserId};
use tokio::sync::RwLock;

use crate::{
    OrderQuery, Result, StoreError,
    store::{OrderStore, UserStore},
};

/// In-memory store for tests and local runs.
///
/// Provides the same semantics as the PostgreSQL implementation,
/// including version compare-and-swap and atomic archival. Archival
/// holds both write locks (orders first, then history) so no reader
/// observes the order in both tables or neither.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    history: Arc<RwLock<Vec<History>>>,
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of active orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Returns the number of archived orders.
    pub async fn history_count(&self) -> usize {
        self.history.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Duplicate(order.id.to_string()));
        }
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> = orders
            .values()
            .filter(|o| query.user_id.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        Ok(matching
            .into_iter()
            .skip(query.effective_offset())
            .take(query.effective_limit())
            .collect())
    }

    async fn update_order(&self, order: &Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id)
            .ok_or_else(|| StoreError::NotFound(order.id.to_string()))?;
        if current.version != order.version {
            return Err(StoreError::VersionConflict {
                id: order.id.to_string(),
                expected: order.version,
                actual: current.version,
            });
        }

        let mut updated = order.clone();
        updated.version = order.version.next();
        updated.updated_at = Utc::now();
        orders.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn archive_order(&self, order: &Order, history: History) -> Result<()> {
        let mut orders = self.orders.write().await;
        let mut archived = self.history.write().await;

        let current = orders
            .get(&order.id)
            .ok_or_else(|| StoreError::NotFound(order.id.to_string()))?;
        if current.version != order.version {
            return Err(StoreError::VersionConflict {
                id: order.id.to_string(),
                expected: order.version,
                actual: current.version,
            });
        }
        if archived.iter().any(|h| h.id == history.id) {
            return Err(StoreError::Duplicate(history.id.to_string()));
        }

        archived.push(history);
        orders.remove(&order.id);
        Ok(())
    }

    async fn get_history(&self, id: &OrderId) -> Result<Option<History>> {
        Ok(self
            .history
            .read()
            .await
            .iter()
            .find(|h| &h.id == id)
            .cloned())
    }

    async fn list_history(&self, query: OrderQuery) -> Result<Vec<History>> {
        let history = self.history.read().await;
        let mut matching: Vec<History> = history
            .iter()
            .filter(|h| query.user_id.is_none_or(|u| h.user_id == u))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.deleted_at
                .cmp(&a.deleted_at)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        Ok(matching
            .into_iter()
            .skip(query.effective_offset())
            .take(query.effective_limit())
            .collect())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(user.id.to_string()));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(user.email.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self, banned_only: bool) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut matching: Vec<User> = users
            .values()
            .filter(|u| !banned_only || u.is_banned)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(matching)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;
        let current = users
            .get(&user.id)
            .ok_or_else(|| StoreError::NotFound(user.id.to_string()))?;
        if current.version != user.version {
            return Err(StoreError::VersionConflict {
                id: user.id.to_string(),
                expected: user.version,
                actual: current.version,
            });
        }

        let mut updated = user.clone();
        updated.version = user.version.next();
        updated.updated_at = Utc::now();
        users.insert(updated.id, updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::{OrderStatus, Role, Version};

    fn test_order(id: &str, user_id: i64) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(id),
            user_id: UserId::new(user_id),
            transaction_id: None,
            address_id: 1,
            status: OrderStatus::Created,
            note: String::new(),
            service_type: "wash".to_string(),
            order_type: "regular".to_string(),
            weight: None,
            price: None,
            collect_date: now,
            estimate_date: now,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        }
    }

    fn test_user(id: i64, email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            role: Role::Customer,
            is_banned: false,
            created_at: now,
            updated_at: now,
            version: Version::first(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_order() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();

        let fetched = store.get_order(&order.id).await.unwrap();
        assert_eq!(fetched, Some(order));
    }

    #[tokio::test]
    async fn insert_duplicate_order_fails() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();

        let result = store.insert_order(order).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn update_bumps_version_and_timestamp() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();

        let mut changed = order.clone();
        changed.note = "ring the bell".to_string();
        let updated = store.update_order(&changed).await.unwrap();

        assert_eq!(updated.version, order.version.next());
        assert_eq!(updated.note, "ring the bell");
        assert!(updated.updated_at >= order.updated_at);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();
        store.update_order(&order).await.unwrap();

        // Second writer still holds the original version.
        let result = store.update_order(&order).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn update_missing_order_is_not_found() {
        let store = InMemoryStore::new();
        let order = test_order("ORDgone", 1);
        let result = store.update_order(&order).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn archive_moves_order_to_history() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();

        let history = History::from_order(&order, Some("cancelled".to_string()), Utc::now());
        store.archive_order(&order, history).await.unwrap();

        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.history_count().await, 1);
        let archived = store.get_history(&order.id).await.unwrap().unwrap();
        assert_eq!(archived.reason.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn archive_with_stale_version_conflicts() {
        let store = InMemoryStore::new();
        let order = test_order("ORDone", 1);
        store.insert_order(order.clone()).await.unwrap();
        store.update_order(&order).await.unwrap();

        let history = History::from_order(&order, None, Utc::now());
        let result = store.archive_order(&order, history).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.history_count().await, 0);
    }

    #[tokio::test]
    async fn list_orders_filters_by_user_and_sorts_newest_first() {
        let store = InMemoryStore::new();
        let mut first = test_order("ORDone", 1);
        first.created_at = Utc::now() - Duration::minutes(5);
        let second = test_order("ORDtwo", 1);
        let other = test_order("ORDthree", 2);
        store.insert_order(first.clone()).await.unwrap();
        store.insert_order(second.clone()).await.unwrap();
        store.insert_order(other).await.unwrap();

        let listed = store
            .list_orders(OrderQuery::new().for_user(UserId::new(1)))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn list_orders_applies_limit_and_offset() {
        let store = InMemoryStore::new();
        for i in 0..15 {
            let mut order = test_order(&format!("ORD{i:03}"), 1);
            order.created_at = Utc::now() - Duration::minutes(i);
            store.insert_order(order).await.unwrap();
        }

        let default_page = store.list_orders(OrderQuery::new()).await.unwrap();
        assert_eq!(default_page.len(), crate::DEFAULT_PAGE_SIZE);

        let second_page = store
            .list_orders(OrderQuery::new().limit(10).offset(10))
            .await
            .unwrap();
        assert_eq!(second_page.len(), 5);
    }

    #[tokio::test]
    async fn insert_user_rejects_duplicate_email() {
        let store = InMemoryStore::new();
        store
            .insert_user(test_user(1, "a@example.com"))
            .await
            .unwrap();

        let result = store.insert_user(test_user(2, "a@example.com")).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn get_user_by_email() {
        let store = InMemoryStore::new();
        let user = test_user(1, "a@example.com");
        store.insert_user(user.clone()).await.unwrap();

        let fetched = store.get_user_by_email("a@example.com").await.unwrap();
        assert_eq!(fetched, Some(user));
        assert!(
            store
                .get_user_by_email("b@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_users_banned_filter() {
        let store = InMemoryStore::new();
        let mut banned = test_user(1, "a@example.com");
        banned.is_banned = true;
        store.insert_user(banned).await.unwrap();
        store
            .insert_user(test_user(2, "b@example.com"))
            .await
            .unwrap();

        assert_eq!(store.list_users(false).await.unwrap().len(), 2);
        let only_banned = store.list_users(true).await.unwrap();
        assert_eq!(only_banned.len(), 1);
        assert!(only_banned[0].is_banned);
    }
}
