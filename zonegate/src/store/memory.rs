//! The reference Record Store backend: an in-process map guarded by a
//! single `RwLock`. This is the "memory" variant of `storage.type`; it is
//! what every end-to-end scenario in this repository actually runs
//! against, since the key-value and tabular backends the original ships
//! are external collaborators outside this core's scope.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_proto::rr::{DNSClass, Record, RecordType};
use tokio::sync::RwLock;

use super::{canonical_key, fingerprint, Store};
use crate::error::app;

const KEY_PREFIX: &str = "zonegate";

struct Entry {
    record: Record,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rdata_text(record: &Record) -> String {
        record
            .data()
            .map(|d| d.to_string())
            .unwrap_or_default()
    }

    fn key_for(record: &Record) -> String {
        let fp = fingerprint(&Self::rdata_text(record));
        canonical_key(
            KEY_PREFIX,
            &record.name().to_utf8(),
            record.dns_class(),
            record.record_type(),
            &fp,
        )
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn set(&self, record: Record, ttl_seconds: Option<u64>) -> app::Result<()> {
        let key = Self::key_for(&record);
        let expires_at = ttl_seconds.map(|ttl| Instant::now() + Duration::from_secs(ttl));
        let mut rows = self.rows.write().await;
        rows.insert(key, Entry { record, expires_at });
        Ok(())
    }

    async fn get(&self, name: &str, class: DNSClass, rtype: RecordType) -> app::Result<Vec<Record>> {
        let now = Instant::now();
        let mut rows = self.rows.write().await;
        rows.retain(|_, entry| entry.expires_at.map(|exp| exp > now).unwrap_or(true));

        let normalized = name.trim_end_matches('.');
        let matches = rows
            .values()
            .filter(|entry| {
                entry.record.dns_class() == class
                    && entry.record.record_type() == rtype
                    && entry.record.name().to_utf8().trim_end_matches('.').eq_ignore_ascii_case(normalized)
            })
            .map(|entry| entry.record.clone())
            .collect();
        Ok(matches)
    }

    async fn del(&self, record: &Record) -> app::Result<()> {
        let key = Self::key_for(record);
        let mut rows = self.rows.write().await;
        rows.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn a_record(name: &str, addr: Ipv4Addr) -> Record {
        let name = Name::from_str(name).unwrap();
        let mut record = Record::from_rdata(name, 3600, RData::A(A(addr)));
        record.set_dns_class(DNSClass::IN);
        record
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        let record = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1));
        store.set(record.clone(), None).await.unwrap();

        let found = store.get("dxvgef.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data(), record.data());
    }

    #[tokio::test]
    async fn get_is_name_and_type_scoped() {
        let store = MemoryStore::new();
        store
            .set(a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1)), None)
            .await
            .unwrap();

        let other_name = store.get("other.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert!(other_name.is_empty());

        let other_type = store
            .get("dxvgef.test.", DNSClass::IN, RecordType::AAAA)
            .await
            .unwrap();
        assert!(other_type.is_empty());
    }

    #[tokio::test]
    async fn setting_distinct_rdata_keeps_both_records() {
        let store = MemoryStore::new();
        store
            .set(a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1)), None)
            .await
            .unwrap();
        store
            .set(a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 2)), None)
            .await
            .unwrap();

        let found = store.get("dxvgef.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn setting_same_rdata_twice_is_idempotent() {
        let store = MemoryStore::new();
        let record = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1));
        store.set(record.clone(), None).await.unwrap();
        store.set(record.clone(), None).await.unwrap();

        let found = store.get("dxvgef.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn del_removes_only_the_matching_fingerprint() {
        let store = MemoryStore::new();
        let kept = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1));
        let removed = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 2));
        store.set(kept.clone(), None).await.unwrap();
        store.set(removed.clone(), None).await.unwrap();

        store.del(&removed).await.unwrap();

        let found = store.get("dxvgef.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].data(), kept.data());
    }

    #[tokio::test]
    async fn del_of_absent_record_is_not_an_error() {
        let store = MemoryStore::new();
        let record = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1));
        assert!(store.del(&record).await.is_ok());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemoryStore::new();
        let record = a_record("dxvgef.test.", Ipv4Addr::new(127, 0, 0, 1));
        store.set(record, Some(0)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let found = store.get("dxvgef.test.", DNSClass::IN, RecordType::A).await.unwrap();
        assert!(found.is_empty());
    }
}
