//! Vendor analytics bundle cache.
//!
//! The expensive bundle (per-product inventory predictions plus per-category
//! sales forecasts) is memoized per vendor with a TTL. `get_or_compute` holds
//! a per-key async lock, so concurrent misses for the same vendor coalesce
//! into one computation with the other callers blocking until it lands.
//! Segmentation and sentiment aggregation are recomputed on every call and
//! deliberately stay outside the bundle.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::domain::VendorId;
use crate::errors::AnalyticsError;
use crate::forecast::ForecastPoint;
use crate::inventory::InventoryPrediction;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("bundle computation exceeded {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub category: String,
    pub points: Vec<ForecastPoint>,
}

/// The memoized analytics payload for one vendor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsBundle {
    pub vendor_id: VendorId,
    pub generated_at: DateTime<Utc>,
    pub inventory: Vec<InventoryPrediction>,
    pub forecasts: Vec<CategoryForecast>,
}

/// Key-value bundle store with per-entry TTL semantics.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the entry only while its TTL has not elapsed.
    async fn get(&self, key: &str) -> Option<AnalyticsBundle>;
    async fn set(&self, key: &str, bundle: AnalyticsBundle, ttl: Duration);
}

/// Process-local store; entries past their deadline read as absent.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, (AnalyticsBundle, Instant)>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Option<AnalyticsBundle> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, deadline)| Instant::now() < *deadline)
            .map(|(bundle, _)| bundle.clone())
    }

    async fn set(&self, key: &str, bundle: AnalyticsBundle, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (bundle, Instant::now() + ttl));
    }
}

pub struct AnalyticsCache {
    store: Arc<dyn CacheStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ttl: Duration,
    compute_timeout: Duration,
}

impl AnalyticsCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, compute_timeout: Duration) -> Self {
        Self { store, locks: Mutex::new(HashMap::new()), ttl, compute_timeout }
    }

    /// Serve the vendor's bundle from the store, or compute and store it.
    /// Concurrent misses for one vendor run `compute` exactly once; the
    /// computation is bounded by the configured timeout.
    pub async fn get_or_compute<F, Fut>(
        &self,
        vendor: VendorId,
        compute: F,
    ) -> Result<AnalyticsBundle, AnalyticsError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AnalyticsBundle, AnalyticsError>>,
    {
        let key = format!("vendor:{}", vendor.0);
        if let Some(bundle) = self.store.get(&key).await {
            debug!(%key, "analytics bundle cache hit");
            return Ok(bundle);
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        // a concurrent holder may have filled the entry while we waited
        if let Some(bundle) = self.store.get(&key).await {
            debug!(%key, "analytics bundle filled while waiting");
            return Ok(bundle);
        }

        debug!(%key, "analytics bundle cache miss, computing");
        let bundle = tokio::time::timeout(self.compute_timeout, compute())
            .await
            .map_err(|_| CacheError::Timeout(self.compute_timeout))??;
        self.store.set(&key, bundle.clone(), self.ttl).await;
        Ok(bundle)
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(key.to_string()).or_default().clone()
    }
}
