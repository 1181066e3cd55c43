//! Shared types for the laundry order backend.
//!
//! Identifier newtypes, the order status machine, and the persisted
//! `Order`/`History`/`User` models used by the store and domain crates.

pub mod model;
pub mod status;
pub mod types;

pub use model::{History, Order, User};
pub use status::{OrderStatus, ParseEnumError, Role};
pub use types::{OrderId, UserId, Version};
