//! JSON envelope for persisted cache entries.
//!
//! Every value the cache writes is wrapped in this envelope:
//!
//! ```text
//! {"data": <json>, "timestamp": <epoch millis>, "ttl": <millis>}
//! ```
//!
//! The shape is stable across versions; `ttl` may be absent in entries
//! written by older clients, in which case the reader's default TTL applies.
//!
//! # Example
//!
//! ```rust
//! use content_kit::serialization::{deserialize_entry, serialize_entry, CacheEntry};
//! use std::time::Duration;
//!
//! # fn main() -> content_kit::Result<()> {
//! let entry = CacheEntry::new("hello", Some(Duration::from_secs(60)));
//! let raw = serialize_entry(&entry)?;
//!
//! let decoded: CacheEntry<String> = deserialize_entry(&raw)?;
//! assert_eq!(decoded.data, "hello");
//! assert_eq!(decoded.ttl, Some(60_000));
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached payload plus the bookkeeping needed to expire it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// The cached value
    pub data: T,
    /// When the entry was written, in epoch milliseconds
    pub timestamp: i64,
    /// Lifetime in milliseconds; `None` defers to the reader's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl<T> CacheEntry<T> {
    /// Stamp `data` with the current time.
    pub fn new(data: T, ttl: Option<Duration>) -> Self {
        CacheEntry {
            data,
            timestamp: now_millis(),
            ttl: ttl.map(duration_millis),
        }
    }

    /// Whether the entry has outlived its TTL at `now` (epoch millis).
    ///
    /// An entry expires once `now - timestamp` strictly exceeds the TTL.
    pub fn is_expired_at(&self, now: i64, default_ttl: Duration) -> bool {
        let ttl = self.ttl.unwrap_or_else(|| duration_millis(default_ttl));
        let age = now.saturating_sub(self.timestamp);
        age > 0 && age as u64 > ttl
    }

    pub fn is_expired(&self, default_ttl: Duration) -> bool {
        self.is_expired_at(now_millis(), default_ttl)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Encode an entry for storage.
///
/// # Errors
/// Returns `Error::SerializationError` if the payload cannot be encoded.
pub fn serialize_entry<T: Serialize>(entry: &CacheEntry<T>) -> Result<String> {
    serde_json::to_string(entry).map_err(|e| {
        log::error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Decode an entry read from storage.
///
/// # Errors
/// Returns `Error::DeserializationError` for malformed JSON or a payload of
/// the wrong shape.
pub fn deserialize_entry<T: DeserializeOwned>(raw: &str) -> Result<CacheEntry<T>> {
    serde_json::from_str(raw).map_err(|e| {
        log::warn!("Cache entry deserialization failed: {}", e);
        Error::DeserializationError(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct TestData {
        id: u64,
        name: String,
    }

    #[test]
    fn test_roundtrip() {
        let data = TestData {
            id: 7,
            name: "test".to_string(),
        };
        let entry = CacheEntry::new(data.clone(), Some(Duration::from_millis(250)));
        let raw = serialize_entry(&entry).expect("Failed to serialize");
        let decoded: CacheEntry<TestData> = deserialize_entry(&raw).expect("Failed to deserialize");

        assert_eq!(decoded.data, data);
        assert_eq!(decoded.ttl, Some(250));
        assert_eq!(decoded.timestamp, entry.timestamp);
    }

    #[test]
    fn test_persisted_shape() {
        let entry = CacheEntry {
            data: json!({"title": "Hello"}),
            timestamp: 1_700_000_000_000,
            ttl: Some(1000),
        };
        let raw = serialize_entry(&entry).expect("Failed to serialize");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("Failed to parse");

        assert_eq!(
            value,
            json!({"data": {"title": "Hello"}, "timestamp": 1_700_000_000_000_i64, "ttl": 1000})
        );
    }

    #[test]
    fn test_missing_ttl_is_accepted() {
        let raw = r#"{"data": 5, "timestamp": 1000}"#;
        let entry: CacheEntry<u32> = deserialize_entry(raw).expect("Failed to deserialize");
        assert_eq!(entry.ttl, None);
        assert!(entry.is_expired_at(1000 + 61_000, Duration::from_secs(60)));
        assert!(!entry.is_expired_at(1000 + 59_000, Duration::from_secs(60)));
    }

    #[test]
    fn test_null_payload() {
        let entry: CacheEntry<Option<TestData>> = CacheEntry::new(None, None);
        let raw = serialize_entry(&entry).expect("Failed to serialize");
        let decoded: CacheEntry<Option<TestData>> =
            deserialize_entry(&raw).expect("Failed to deserialize");
        assert_eq!(decoded.data, None);
    }

    #[test]
    fn test_expiry_boundary() {
        let entry = CacheEntry {
            data: (),
            timestamp: 1000,
            ttl: Some(10),
        };
        assert!(!entry.is_expired_at(1000, Duration::ZERO));
        assert!(!entry.is_expired_at(1010, Duration::ZERO));
        assert!(entry.is_expired_at(1011, Duration::ZERO));
        // Clock moved backwards: never expired.
        assert!(!entry.is_expired_at(900, Duration::ZERO));
    }

    #[test]
    fn test_corrupted_entry_is_error() {
        let result: Result<CacheEntry<TestData>> = deserialize_entry("{\"data\": 1}");
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }
}
