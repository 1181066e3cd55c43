//! User account management.

mod password;
mod request;
mod service;

pub use password::{hash_password, verify_password};
pub use request::{LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateProfileRequest};
pub use service::UserService;
