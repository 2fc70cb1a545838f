//! Cluster cache store.
//!
//! Results are memoized per `(event_code, sample_size)`:
//! - Fresh entries (younger than the TTL) are served without network access
//! - One fetch per key at a time; callers that queued behind it reuse its result
//! - A failed fetch never replaces an entry; a still-fresh entry keeps serving

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evpix_models::Cluster;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::ClusterQuery;
use crate::metrics::{record_coalesced, record_fetch_failure, record_hit, record_miss};

/// Default time-to-live of a cached cluster list (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ttl: std::env::var("CLUSTER_CACHE_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TTL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub event_code: String,
    pub sample_size: u32,
}

impl CacheKey {
    pub fn new(event_code: impl Into<String>, sample_size: u32) -> Self {
        Self {
            event_code: event_code.into(),
            sample_size,
        }
    }
}

/// How a load was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Fresh entry, no network access
    Cached,
    /// This call fetched
    Fetched,
    /// Another call's fetch completed while this one waited
    Coalesced,
    /// Refresh failed; the still-fresh previous entry was served
    Fallback,
    /// Fetch failed and nothing fresh exists; the result is empty
    Failed { message: String },
}

/// Result of a cache load.
#[derive(Debug, Clone)]
pub struct ClusterLoad {
    pub clusters: Arc<Vec<Cluster>>,
    pub origin: LoadOrigin,
}

impl ClusterLoad {
    fn new(clusters: Arc<Vec<Cluster>>, origin: LoadOrigin) -> Self {
        Self { clusters, origin }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.origin, LoadOrigin::Failed { .. })
    }
}

struct CacheEntry {
    data: Arc<Vec<Cluster>>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Per-key state. The mutex is held for the whole fetch, which is what
/// limits each key to a single in-flight request.
#[derive(Default)]
struct Slot {
    /// Bumped every time a fetch stores a new entry
    generation: AtomicU64,
    entry: Mutex<Option<CacheEntry>>,
}

/// TTL cache in front of a [`ClusterQuery`].
pub struct ClusterCache {
    query: Arc<dyn ClusterQuery>,
    config: CacheConfig,
    slots: RwLock<HashMap<CacheKey, Arc<Slot>>>,
}

impl ClusterCache {
    pub fn new(query: Arc<dyn ClusterQuery>, config: CacheConfig) -> Self {
        Self {
            query,
            config,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Cluster list for an event; empty when nothing could be loaded.
    pub async fn get_clusters(
        &self,
        event_code: &str,
        sample_size: u32,
        force_refresh: bool,
    ) -> Arc<Vec<Cluster>> {
        self.load(event_code, sample_size, force_refresh)
            .await
            .clusters
    }

    /// Load clusters, reporting how the result was obtained.
    pub async fn load(
        &self,
        event_code: &str,
        sample_size: u32,
        force_refresh: bool,
    ) -> ClusterLoad {
        let key = CacheKey::new(event_code, sample_size);
        let slot = self.slot(&key).await;
        let seen_generation = slot.generation.load(Ordering::Acquire);

        let mut entry = slot.entry.lock().await;

        if let Some(current) = entry.as_ref().filter(|c| c.is_fresh(self.config.ttl)) {
            if slot.generation.load(Ordering::Acquire) != seen_generation {
                debug!(event_code, sample_size, "Reusing result of concurrent fetch");
                record_coalesced();
                return ClusterLoad::new(Arc::clone(&current.data), LoadOrigin::Coalesced);
            }
            if !force_refresh {
                debug!(event_code, sample_size, "Cluster cache hit");
                record_hit();
                return ClusterLoad::new(Arc::clone(&current.data), LoadOrigin::Cached);
            }
        }

        record_miss();
        debug!(event_code, sample_size, force_refresh, "Fetching clusters");

        match self.query.query_clusters(event_code, sample_size).await {
            Ok(clusters) => {
                let data = Arc::new(clusters);
                *entry = Some(CacheEntry {
                    data: Arc::clone(&data),
                    fetched_at: Instant::now(),
                });
                slot.generation.fetch_add(1, Ordering::Release);
                ClusterLoad::new(data, LoadOrigin::Fetched)
            }
            Err(e) => match entry.as_ref().filter(|c| c.is_fresh(self.config.ttl)) {
                Some(current) => {
                    warn!(
                        event_code,
                        sample_size, "Cluster refresh failed, serving cached list: {}", e
                    );
                    record_fetch_failure(true);
                    ClusterLoad::new(Arc::clone(&current.data), LoadOrigin::Fallback)
                }
                None => {
                    warn!(event_code, sample_size, "Cluster fetch failed: {}", e);
                    record_fetch_failure(false);
                    ClusterLoad::new(
                        Arc::new(Vec::new()),
                        LoadOrigin::Failed {
                            message: e.to_string(),
                        },
                    )
                }
            },
        }
    }

    /// Drop the entry for one key. An in-flight fetch for it still completes.
    pub async fn invalidate(&self, event_code: &str, sample_size: u32) {
        let key = CacheKey::new(event_code, sample_size);
        let slot = self.slots.read().await.get(&key).cloned();
        if let Some(slot) = slot {
            *slot.entry.lock().await = None;
        }
        self.prune_idle_slots().await;
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let slots: Vec<Arc<Slot>> = self.slots.read().await.values().cloned().collect();
        for slot in slots {
            *slot.entry.lock().await = None;
        }
        self.prune_idle_slots().await;
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Remove empty slots that no caller holds. A held slot may have a fetch
    /// queued on it and must stay so the key keeps a single fetch in flight.
    async fn prune_idle_slots(&self) {
        let mut slots = self.slots.write().await;
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || slot.entry.try_lock().map_or(true, |entry| entry.is_some())
        });
    }

    async fn slot(&self, key: &CacheKey) -> Arc<Slot> {
        // Fast path: read lock
        {
            let slots = self.slots.read().await;
            if let Some(slot) = slots.get(key) {
                return Arc::clone(slot);
            }
        }

        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}
