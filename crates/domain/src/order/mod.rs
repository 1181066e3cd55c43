//! Order lifecycle manager and related types.

mod request;
mod service;

pub use request::{OrderDraft, OrderPatch, PaymentRequest};
pub use service::OrderService;

use common::{Order, Role, UserId};

/// The authenticated subject performing an operation.
///
/// Ownership checks compare the caller's id against the order's owner;
/// admins bypass the check on reads and perform the admin-only
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub role: Role,
}

impl Caller {
    /// A customer caller.
    pub fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    /// An admin caller.
    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Returns true if the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Returns true if the caller owns the given order.
    pub fn owns(&self, order: &Order) -> bool {
        self.user_id == order.user_id
    }
}
