use common::UserId;

/// Page size applied when a listing supplies no explicit limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Filter and pagination for order and history listings.
///
/// Results are always newest-first (descending creation time). Without
/// an explicit limit, listings are capped at [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Restrict to a single owner. None lists every user's records.
    pub user_id: Option<UserId>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates an empty query (all records, default page size).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to the given owner.
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Sets the maximum number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` records.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The limit actually applied by stores.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// The offset actually applied by stores.
    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_caps_at_page_size() {
        let query = OrderQuery::new();
        assert_eq!(query.effective_limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.effective_offset(), 0);
        assert!(query.user_id.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let query = OrderQuery::new()
            .for_user(UserId::new(42))
            .limit(25)
            .offset(50);
        assert_eq!(query.user_id, Some(UserId::new(42)));
        assert_eq!(query.effective_limit(), 25);
        assert_eq!(query.effective_offset(), 50);
    }
}
