//! Content hashing for change detection.
//!
//! Hashing the serialized JSON of a record gives a deterministic
//! fingerprint, so the pull phase can tell "remote confirmed what we
//! pushed" apart from "remote actually differs" without comparing every
//! field.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compute a SHA256 hash of a serializable value.
///
/// # Panics
///
/// Panics if the value cannot be serialized to JSON. This should never
/// happen for our data types, which are all serializable.
#[must_use]
pub fn content_hash<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_string(value).expect("serialization should not fail");
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True when two values serialize to identical content.
#[must_use]
pub fn same_content<T: Serialize>(a: &T, b: &T) -> bool {
    content_hash(a) == content_hash(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestRecord {
        id: String,
        value: i32,
    }

    #[test]
    fn test_content_hash_deterministic() {
        let record = TestRecord {
            id: "t1".into(),
            value: 42,
        };
        assert_eq!(content_hash(&record), content_hash(&record));
        assert_eq!(content_hash(&record).len(), 64);
    }

    #[test]
    fn test_same_content_detects_differences() {
        let a = TestRecord {
            id: "t1".into(),
            value: 42,
        };
        let b = TestRecord {
            id: "t1".into(),
            value: 43,
        };
        assert!(same_content(&a, &a));
        assert!(!same_content(&a, &b));
    }
}
