//! HTTP route handlers.

pub mod health;
pub mod history;
pub mod metrics;
pub mod orders;
pub mod users;

use serde::Deserialize;
use store::{DEFAULT_PAGE_SIZE, OrderQuery};

/// Largest page size a caller may request.
const MAX_PAGE_SIZE: usize = 100;

/// Largest offset passed through to the store layer.
const MAX_OFFSET: usize = i64::MAX as usize;

/// Page-based pagination query parameters for list endpoints.
///
/// Pages are 1-based; both parameters are optional and default to the
/// first page at the standard page size.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl Pagination {
    /// Converts the page/limit pair into a store query.
    ///
    /// Out-of-range values are clamped rather than rejected, so absurd
    /// page numbers yield an empty page instead of an error.
    pub fn to_query(self) -> OrderQuery {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        let offset = page
            .saturating_sub(1)
            .saturating_mul(limit)
            .min(MAX_OFFSET);
        OrderQuery::new().limit(limit).offset(offset)
    }
}
