use async_trait::async_trait;
use common::{History, Order, OrderId, User, UserId};

use crate::{OrderQuery, Result};

/// Core trait for order persistence.
///
/// Implementations must be thread-safe (Send + Sync). Writes that carry
/// a record compare-and-swap on its `version`: the stored version must
/// equal the one the caller read, otherwise `VersionConflict` is
/// returned and nothing changes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order. Fails with `Duplicate` if the id is taken.
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Fetches an order by id. Returns None if it does not exist.
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>>;

    /// Lists active orders matching the query, newest first.
    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Updates an order in place, bumping its version and `updated_at`.
    ///
    /// Returns the stored record. Fails with `NotFound` if the order was
    /// deleted, or `VersionConflict` if it changed since the read.
    async fn update_order(&self, order: &Order) -> Result<Order>;

    /// Archives an order: inserts the history row and deletes the active
    /// order in one atomic step.
    ///
    /// The delete compare-and-swaps on the order's version, so a
    /// concurrent transition cannot archive the same order twice.
    async fn archive_order(&self, order: &Order, history: History) -> Result<()>;

    /// Fetches a history row by the original order id.
    async fn get_history(&self, id: &OrderId) -> Result<Option<History>>;

    /// Lists history rows matching the query, newest archival first.
    async fn list_history(&self, query: OrderQuery) -> Result<Vec<History>>;
}

/// Core trait for user persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Fails with `Duplicate` if the id or email is
    /// already registered.
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Fetches a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Fetches a user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Lists users, optionally only banned ones, newest first.
    async fn list_users(&self, banned_only: bool) -> Result<Vec<User>>;

    /// Updates a user in place, bumping its version and `updated_at`.
    async fn update_user(&self, user: &User) -> Result<User>;
}
