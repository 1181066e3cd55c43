//! Record store for the laundry backend.
//!
//! Exposes the `OrderStore` and `UserStore` traits plus two
//! implementations: an in-memory store for tests and local runs, and a
//! PostgreSQL store backed by sqlx.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{DEFAULT_PAGE_SIZE, OrderQuery};
pub use store::{OrderStore, UserStore};
