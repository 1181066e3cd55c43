//! Domain error types.

use common::{OrderId, OrderStatus, UserId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during order lifecycle operations.
///
/// Every variant is a result value, never internal control flow. Store
/// failures pass through opaque and uninterpreted.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No order with the given id.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The caller is neither the order's owner nor an admin.
    #[error("order {id} does not belong to user {caller}")]
    OwnershipMismatch { id: OrderId, caller: UserId },

    /// The order's current status forbids the attempted transition.
    #[error("cannot {action} order in {status} status")]
    InvalidTransition {
        status: OrderStatus,
        action: &'static str,
    },

    /// Malformed weight or payment payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Completion requires a payment transaction reference.
    #[error("order cannot be completed without a transaction reference")]
    MissingTransaction,

    /// Payment requires the order to be priced first.
    #[error("payment is not allowed before a price is set")]
    PaymentNotAllowed,

    /// A concurrent operation changed the order between read and write.
    /// Exactly one of the competing operations succeeds.
    #[error("order {0} was modified concurrently")]
    ConcurrentModification(OrderId),

    /// Opaque failure from the record store.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for OrderError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => OrderError::NotFound(OrderId::new(id)),
            StoreError::VersionConflict { id, .. } => {
                OrderError::ConcurrentModification(OrderId::new(id))
            }
            other => OrderError::Store(other),
        }
    }
}

/// Errors that can occur during user account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// No user with the given id.
    #[error("user not found: {0}")]
    NotFound(UserId),

    /// The email is already registered.
    #[error("email already registered: {0}")]
    EmailTaken(String),

    /// Unknown email or wrong password. Deliberately indistinct.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account is banned.
    #[error("user is banned")]
    Banned,

    /// Malformed registration or update payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Opaque failure from the record store.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(key) => UserError::EmailTaken(key),
            other => UserError::Store(other),
        }
    }
}
