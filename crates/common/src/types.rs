use rand::Rng;
use serde::{Deserialize, Serialize};

/// Character set for generated order id suffixes.
const ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random suffix appended to the order id prefix.
const ID_SUFFIX_LEN: usize = 10;

/// Custom epoch for generated user ids: 2024-01-01T00:00:00Z.
///
/// Shifting raw unix millis left by 22 bits would exceed `i64::MAX`
/// once the timestamp passes 2^41 ms; measuring from a recent epoch
/// keeps the timestamp field in range for roughly 69 years.
const USER_ID_EPOCH_MILLIS: i64 = 1_704_067_200_000;

/// Bit width of the random low field in a user id.
const USER_ID_RANDOM_BITS: u32 = 22;

/// Unique identifier for an order.
///
/// Orders use human-readable ids: an uppercase prefix followed by a
/// random alphanumeric suffix (e.g. `ORDx7Kp2mQ9aB`). Uniqueness is
/// probabilistic; the store reports duplicates and callers retry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Creates an order id from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id with the given prefix and a random suffix.
    pub fn generate(prefix: &str) -> Self {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(prefix.len() + ID_SUFFIX_LEN);
        id.push_str(prefix);
        for _ in 0..ID_SUFFIX_LEN {
            let idx = rng.gen_range(0..ID_CHARSET.len());
            id.push(ID_CHARSET[idx] as char);
        }
        Self(id)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a user.
///
/// Snowflake-style: millisecond timestamp in the high bits, random low
/// bits. Sorts roughly by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user id from an existing value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Generates a fresh snowflake-style id.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis() - USER_ID_EPOCH_MILLIS;
        let low: i64 = rand::thread_rng().gen_range(0..(1 << USER_ID_RANDOM_BITS));
        Self::from_parts(millis, low)
    }

    fn from_parts(millis_since_epoch: i64, low: i64) -> Self {
        Self((millis_since_epoch << USER_ID_RANDOM_BITS) | low)
    }

    /// Returns the underlying integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Per-record version counter for optimistic concurrency control.
///
/// Updates and archivals compare-and-swap on the stored version, so of
/// two concurrent writes to the same order exactly one succeeds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(version: i64) -> Self {
        Self(version)
    }

    /// The version assigned to a freshly created record.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the version as an i64.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_generate_uses_prefix() {
        let id = OrderId::generate("ORD");
        assert!(id.as_str().starts_with("ORD"));
        assert_eq!(id.as_str().len(), 3 + ID_SUFFIX_LEN);
    }

    #[test]
    fn order_id_generate_creates_unique_ids() {
        let id1 = OrderId::generate("ORD");
        let id2 = OrderId::generate("ORD");
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_suffix_is_alphanumeric() {
        let id = OrderId::generate("ORD");
        assert!(id.as_str()[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn order_id_serialization_is_transparent() {
        let id = OrderId::new("ORDabc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"ORDabc123\"");
    }

    #[test]
    fn user_id_generate_creates_unique_ids() {
        let id1 = UserId::generate();
        let id2 = UserId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn user_id_timestamp_fits_for_decades() {
        // Unix millis for 2050-01-01T00:00:00Z; shifting this without
        // the epoch offset would overflow an i64.
        let year_2050 = 2_524_608_000_000 - USER_ID_EPOCH_MILLIS;
        let id = UserId::from_parts(year_2050, (1 << USER_ID_RANDOM_BITS) - 1);
        assert!(id.as_i64() > 0);
        assert!(id > UserId::generate());
    }

    #[test]
    fn user_id_sorts_by_generation_time() {
        let earlier = UserId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = UserId::generate();
        assert!(earlier < later);
    }

    #[test]
    fn version_first_and_next() {
        let v = Version::first();
        assert_eq!(v.as_i64(), 1);
        assert_eq!(v.next().as_i64(), 2);
    }

    #[test]
    fn version_default_predates_first() {
        assert!(Version::default() < Version::first());
    }
}
