//! Domain layer for the laundry backend.
//!
//! This crate provides:
//! - the order lifecycle manager with its status guards, ownership
//!   checks and archive-on-terminal side effect
//! - user account management (registration, login, bans)
//! - validated request payloads for both

pub mod error;
pub mod order;
pub mod user;

pub use error::{OrderError, UserError};
pub use order::{Caller, OrderDraft, OrderPatch, OrderService, PaymentRequest};
pub use user::{
    LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest, UserService,
};
