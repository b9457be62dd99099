//! In-memory TTL cache with a background sweeper.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default period of the background sweep, independent of the TTL.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Read and write counters. A read of an expired entry counts as a miss;
/// `evictions` counts only entries physically removed by a sweep or `purge_expired`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

struct Inner<V> {
    // tokio's RwLock queues writers FIFO, so the sweep cannot be starved by readers.
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    stats: AtomicStats,
}

impl<V> Inner<V> {
    async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        let removed = before - entries.len();
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }
}

/// Concurrency-safe key/value store where every entry expires `ttl` after its last `set`.
///
/// - Reads never mutate: an expired entry reads as a miss until the sweep removes it
/// - The sweep runs every `sweep_interval` on the ambient Tokio runtime
/// - Dropping the cache (or calling [`TtlCache::stop`]) ends the sweep
///
/// The cache is not `Clone`; share it behind an `Arc`.
pub struct TtlCache<V> {
    inner: Arc<Inner<V>>,
    sweeper: Option<CancellationToken>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_config(CacheConfig::new(ttl))
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let inner = Arc::new(Inner {
            entries: RwLock::new(HashMap::new()),
            ttl: config.ttl,
            stats: AtomicStats::default(),
        });
        let sweeper = spawn_sweeper(Arc::downgrade(&inner), config.sweep_interval);
        Self { inner, sweeper }
    }

    /// Copy of the value under `key`, if present and not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.inner.entries.read().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or overwrite; the entry expires `ttl` from now.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.inner.ttl,
        };
        self.inner.entries.write().await.insert(key.into(), entry);
        self.inner.stats.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.inner.entries.write().await.remove(key).is_some()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.inner.entries.write().await.clear();
    }

    /// Physically remove expired entries now; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.inner.purge_expired().await
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats.to_stats()
    }

    /// Whether the background sweep is (still) scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .as_ref()
            .map(|t| !t.is_cancelled())
            .unwrap_or(false)
    }

    /// Stop the background sweep. Entries stay readable; expiry remains lazy.
    pub fn stop(&self) {
        if let Some(token) = &self.sweeper {
            token.cancel();
        }
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        if let Some(token) = &self.sweeper {
            token.cancel();
        }
    }
}

fn spawn_sweeper<V>(inner: Weak<Inner<V>>, period: Duration) -> Option<CancellationToken>
where
    V: Send + Sync + 'static,
{
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(h) => h,
        Err(_) => {
            warn!("TtlCache created outside a Tokio runtime; background sweep disabled");
            return None;
        }
    };
    let period = period.max(Duration::from_millis(1));
    let token = CancellationToken::new();
    let stop = token.clone();
    handle.spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    let removed = inner.purge_expired().await;
                    if removed > 0 {
                        debug!(removed, "ttl cache sweep evicted expired entries");
                    } else {
                        trace!("ttl cache sweep found nothing to evict");
                    }
                }
            }
        }
        debug!("ttl cache sweeper stopped");
    });
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("a").await, None);
        cache.set("a", 1).await;
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.len().await, 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiry() {
        let cache: TtlCache<&'static str> = TtlCache::new(Duration::from_millis(80));
        cache.set("k", "old").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.set("k", "new").await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.get("k").await, Some("new"));
    }

    #[tokio::test]
    async fn test_expired_read_is_miss_without_removal() {
        let cache: TtlCache<u8> = TtlCache::new(Duration::from_millis(20));
        cache.set("k", 7).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
        // Still physically present until a sweep runs.
        assert_eq!(cache.inner.entries.read().await.len(), 1);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.inner.entries.read().await.len(), 0);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_background_sweep_evicts() {
        let cache: TtlCache<u8> = TtlCache::with_config(
            CacheConfig::new(Duration::from_millis(10))
                .with_sweep_interval(Duration::from_millis(20)),
        );
        cache.set("k", 1).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.inner.entries.read().await.len(), 0);
    }

    #[tokio::test]
    async fn test_stop_halts_sweep() {
        let cache: TtlCache<u8> = TtlCache::with_config(
            CacheConfig::new(Duration::from_millis(10))
                .with_sweep_interval(Duration::from_millis(20)),
        );
        assert!(cache.is_sweeping());
        cache.stop();
        assert!(!cache.is_sweeping());
        cache.set("k", 1).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get("k").await, None);
        assert_eq!(cache.inner.entries.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_drop_cancels_sweeper() {
        let cache: TtlCache<u8> = TtlCache::new(Duration::from_secs(1));
        let token = cache.sweeper.clone().unwrap();
        drop(cache);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_outside_runtime_has_no_sweeper() {
        let cache: TtlCache<u8> = TtlCache::new(Duration::from_secs(1));
        assert!(!cache.is_sweeping());
    }
}
