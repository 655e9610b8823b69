use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use freshness::BatchResult;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("share not found")]
    NotFound,

    #[error("share has expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub share_id: String,
    pub payload: BatchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ShareRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 128 random bits, lowercase hex.
pub fn new_share_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// In-memory share records with a fixed time-to-live.
///
/// Expiry is enforced twice: a read that finds an expired record deletes it
/// and reports [`ShareError::Expired`], and [`ShareStore::sweep`] drops every
/// expired record in one pass.
pub struct ShareStore {
    records: RwLock<HashMap<String, ShareRecord>>,
    ttl: Duration,
}

impl ShareStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        // Out-of-range lifetimes saturate; `create_at` clamps to the calendar end.
        let ttl = Duration::from_std(ttl).unwrap_or(Duration::MAX);
        Self {
            records: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create(
        &self,
        payload: BatchResult,
        image: Option<String>,
    ) -> (String, DateTime<Utc>) {
        self.create_at(payload, image, Utc::now()).await
    }

    pub async fn create_at(
        &self,
        payload: BatchResult,
        image: Option<String>,
        now: DateTime<Utc>,
    ) -> (String, DateTime<Utc>) {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut records = self.records.write().await;

        let mut share_id = new_share_id();
        while records.contains_key(&share_id) {
            share_id = new_share_id();
        }

        records.insert(
            share_id.clone(),
            ShareRecord {
                share_id: share_id.clone(),
                payload,
                image,
                created_at: now,
                expires_at,
            },
        );
        debug!(share_id=%share_id, expires_at=%expires_at, "share stored");
        (share_id, expires_at)
    }

    pub async fn get(&self, share_id: &str) -> Result<ShareRecord, ShareError> {
        self.get_at(share_id, Utc::now()).await
    }

    pub async fn get_at(&self, share_id: &str, now: DateTime<Utc>) -> Result<ShareRecord, ShareError> {
        {
            let records = self.records.read().await;
            match records.get(share_id) {
                None => return Err(ShareError::NotFound),
                Some(rec) if !rec.is_expired(now) => return Ok(rec.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock; a sweep may have won the race.
        let mut records = self.records.write().await;
        match records.get(share_id) {
            None => Err(ShareError::NotFound),
            Some(rec) if !rec.is_expired(now) => Ok(rec.clone()),
            Some(_) => {
                records.remove(share_id);
                debug!(share_id=%share_id, "expired share evicted on read");
                Err(ShareError::Expired)
            }
        }
    }

    /// Removes every expired record; returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, rec| !rec.is_expired(now));
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;
    use freshness::{assemble, AnalysisSource, ItemAnalysis, Recommendation};

    fn sample_batch() -> BatchResult {
        let items = vec![ItemAnalysis::new("Pear #1", 72, Recommendation::Check)];
        assemble(items, AnalysisSource::Primary, Utc::now())
    }

    fn store() -> ShareStore {
        ShareStore::new(std::time::Duration::from_secs(7 * 24 * 3600))
    }

    #[test]
    fn share_ids_are_128_bit_hex() {
        let id = new_share_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, new_share_id());
    }

    #[tokio::test]
    async fn stored_payload_reads_back_unchanged() {
        let store = store();
        let batch = sample_batch();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let (id, expires_at) = store.create_at(batch.clone(), Some("data:image/png;base64,AA".into()), t0).await;
        assert_eq!(expires_at, t0 + Duration::days(7));

        let rec = store.get_at(&id, t0 + Duration::days(6)).await.unwrap();
        assert_eq!(rec.payload, batch);
        assert_eq!(rec.image.as_deref(), Some("data:image/png;base64,AA"));
        assert_eq!(rec.created_at, t0);
    }

    #[tokio::test]
    async fn expired_read_reports_once_then_not_found() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (id, _) = store.create_at(sample_batch(), None, t0).await;

        let later = t0 + Duration::days(7) + Duration::seconds(1);
        assert_eq!(store.get_at(&id, later).await, Err(ShareError::Expired));
        assert_eq!(store.get_at(&id, later).await, Err(ShareError::NotFound));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expiry_boundary_is_inclusive() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let (id, expires_at) = store.create_at(sample_batch(), None, t0).await;

        assert!(store.get_at(&id, expires_at - Duration::seconds(1)).await.is_ok());
        assert_eq!(store.get_at(&id, expires_at).await, Err(ShareError::Expired));
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_records() {
        let store = store();
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let (old, _) = store.create_at(sample_batch(), None, t0).await;
        let (fresh, _) = store.create_at(sample_batch(), None, t0 + Duration::days(3)).await;

        let removed = store.sweep_at(t0 + Duration::days(8)).await;
        assert_eq!(removed, 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_at(&old, t0 + Duration::days(8)).await, Err(ShareError::NotFound));
        assert!(store.get_at(&fresh, t0 + Duration::days(8)).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        assert_eq!(store().get("deadbeef").await, Err(ShareError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reads_sweeps_and_creates_around_expiry() {
        let store = Arc::new(store());
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let expiry = t0 + Duration::days(7);

        let mut old_ids = Vec::new();
        for _ in 0..32 {
            old_ids.push(store.create_at(sample_batch(), None, t0).await.0);
        }

        let mut readers = Vec::new();
        for round in 0..8 {
            for id in &old_ids {
                let (store, id) = (store.clone(), id.clone());
                // Half of the reads land just before the expiry instant, half on it.
                let at = if round % 2 == 0 { expiry - Duration::seconds(1) } else { expiry };
                readers.push(tokio::spawn(async move { (at, id.clone(), store.get_at(&id, at).await) }));
            }
        }

        let mut sweepers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            sweepers.push(tokio::spawn(async move { store.sweep_at(expiry).await }));
        }

        let mut creators = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            creators.push(tokio::spawn(async move { store.create_at(sample_batch(), None, expiry).await }));
        }

        let mut expired_reports: HashMap<String, usize> = HashMap::new();
        for handle in readers {
            let (at, id, res) = handle.await.unwrap();
            match res {
                Ok(rec) => {
                    assert!(at < expiry, "expired record read as fresh");
                    assert_eq!(rec.share_id, id);
                    assert_eq!(rec.expires_at, expiry);
                }
                Err(ShareError::Expired) => {
                    assert_eq!(at, expiry);
                    *expired_reports.entry(id).or_default() += 1;
                }
                Err(ShareError::NotFound) => {}
            }
        }
        assert!(expired_reports.values().all(|&n| n == 1), "an expired share was reported twice");

        let swept = sum_joined(sweepers).await;
        // Every old record leaves the map exactly once, by a sweep or by a read.
        assert_eq!(swept + expired_reports.len(), old_ids.len());

        let mut new_ids = Vec::new();
        for handle in creators {
            let (id, expires_at) = handle.await.unwrap();
            assert_eq!(expires_at, expiry + Duration::days(7));
            new_ids.push(id);
        }

        store.sweep_at(expiry).await;
        assert_eq!(store.len().await, new_ids.len());
        for id in &new_ids {
            assert!(store.get_at(id, expiry).await.is_ok());
        }
        for id in &old_ids {
            assert_eq!(store.get_at(id, expiry).await, Err(ShareError::NotFound));
        }
    }

    async fn sum_joined(handles: Vec<tokio::task::JoinHandle<usize>>) -> usize {
        let mut total = 0;
        for h in handles {
            total += h.await.unwrap();
        }
        total
    }

    #[tokio::test]
    async fn ttl_beyond_calendar_range_saturates() {
        let store = ShareStore::new(std::time::Duration::from_secs(u64::MAX / 4));
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let (id, expires_at) = store.create_at(sample_batch(), None, t0).await;
        assert_eq!(expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(store.get_at(&id, t0 + Duration::days(365 * 100)).await.is_ok());
    }
}
