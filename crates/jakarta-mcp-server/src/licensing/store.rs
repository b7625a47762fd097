//! Licence-session persistence seam.
//!
//! The contract is deliberately small: eventual consistency within one
//! process, case-insensitive email matching, and TTL expiry honoured on
//! read. Deployments may swap in any backing store; the bundled
//! implementation keeps records in memory.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::Tier;

/// One stored licence session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseSessionRecord {
    pub session_id: String,
    pub email: String,
    pub license_key: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LicenseSessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Pluggable key/value store for licence sessions
#[async_trait]
pub trait LicenseSessionStore: Send + Sync {
    async fn put(&self, record: LicenseSessionRecord, ttl: Duration);
    async fn get_by_email(&self, email: &str) -> Option<LicenseSessionRecord>;
    async fn get_by_key(&self, key: &str) -> Option<LicenseSessionRecord>;
    async fn delete(&self, session_id: &str);
}

/// In-memory store; expiry is enforced lazily on read.
#[derive(Default)]
pub struct InMemoryLicenseStore {
    records: RwLock<HashMap<String, LicenseSessionRecord>>,
}

impl InMemoryLicenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn find(
        &self,
        matches: impl Fn(&LicenseSessionRecord) -> bool,
    ) -> Option<LicenseSessionRecord> {
        let now = Utc::now();
        let records = self.records.read().await;
        records
            .values()
            .find(|record| !record.is_expired(now) && matches(record))
            .cloned()
    }
}

#[async_trait]
impl LicenseSessionStore for InMemoryLicenseStore {
    async fn put(&self, mut record: LicenseSessionRecord, ttl: Duration) {
        record.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        let mut records = self.records.write().await;
        records.insert(record.session_id.clone(), record);
    }

    async fn get_by_email(&self, email: &str) -> Option<LicenseSessionRecord> {
        let needle = email.to_lowercase();
        self.find(|record| record.email.to_lowercase() == needle)
            .await
    }

    async fn get_by_key(&self, key: &str) -> Option<LicenseSessionRecord> {
        self.find(|record| record.license_key == key).await
    }

    async fn delete(&self, session_id: &str) {
        let mut records = self.records.write().await;
        records.remove(session_id);
    }
}
