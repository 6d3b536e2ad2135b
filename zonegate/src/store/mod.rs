//! A polymorphic `{Set, Get, Del}` capability set keyed by
//! `(name, class, type)` plus a content fingerprint. Concrete backends
//! are tagged variants selected at startup via `storage.type`; only the
//! in-process reference backend is built in (see [`memory`]).

pub mod memory;

use async_trait::async_trait;
use hickory_proto::rr::{DNSClass, Record, RecordType};

use crate::error::app;

/// MD5 of the canonical rdata text, middle 16 hex digits (bytes 4..20 of
/// the 32-hex-digit digest). Reused unchanged from the system this was
/// modeled on: it is a deduplication identity, not a cryptographic one,
/// and existing stored keys depend on the exact bit pattern.
pub fn fingerprint(rdata_text: &str) -> String {
    let digest = md5::compute(rdata_text.as_bytes());
    format!("{digest:x}")[4..20].to_string()
}

/// Canonical colon-separated key: `prefix:name:class:type:fingerprint`.
/// `name` carries no trailing dot, matching the storage key shape.
pub fn canonical_key(prefix: &str, name: &str, class: DNSClass, rtype: RecordType, fp: &str) -> String {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    format!("{prefix}:{trimmed}:{class}:{rtype}:{fp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_16_hex_chars() {
        let fp = fingerprint("127.0.0.1");
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint("127.0.0.1"), fingerprint("127.0.0.1"));
        assert_ne!(fingerprint("127.0.0.1"), fingerprint("127.0.0.2"));
    }

    #[test]
    fn canonical_key_strips_trailing_dot() {
        let with_dot = canonical_key("zonegate", "dxvgef.test.", DNSClass::IN, RecordType::A, "abcd");
        let without_dot = canonical_key("zonegate", "dxvgef.test", DNSClass::IN, RecordType::A, "abcd");
        assert_eq!(with_dot, without_dot);
        assert_eq!(with_dot, "zonegate:dxvgef.test:IN:A:abcd");
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert the record. When `ttl_seconds` is `Some`, the backend
    /// materializes expiry at `now + ttl`; `None` means persistent
    /// regardless of the record's own TTL field. Upserts on the full
    /// `(name, class, type, fingerprint)` key; registering the same rr
    /// twice is a no-op change of state.
    async fn set(&self, record: Record, ttl_seconds: Option<u64>) -> app::Result<()>;

    /// Every non-expired record whose key matches `(name, class, type)`.
    /// Order is unspecified.
    async fn get(&self, name: &str, class: DNSClass, rtype: RecordType) -> app::Result<Vec<Record>>;

    /// Remove the record identified by `(name, class, type, fingerprint)`.
    /// Deleting a record that is not present is not an error.
    async fn del(&self, record: &Record) -> app::Result<()>;
}
