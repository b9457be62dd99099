//! Single-flight lookups on top of [`TtlCache`].

use super::key::CacheKey;
use super::ttl::{CacheConfig, CacheStats, TtlCache};
use crate::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::trace;

type Flight<V> = Shared<BoxFuture<'static, std::result::Result<V, Arc<Error>>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupStats {
    pub cache: CacheStats,
    /// Loader invocations (one per flight).
    pub loads: u64,
    /// Callers that joined a flight started by someone else.
    pub coalesced: u64,
}

struct Inner<V> {
    cache: TtlCache<V>,
    flights: Mutex<HashMap<String, Flight<V>>>,
    loads: AtomicU64,
    coalesced: AtomicU64,
}

/// TTL cache that runs at most one loader per key at a time.
///
/// Concurrent misses for the same key await the same in-progress load and share
/// its result. A successful load is written to the cache before its flight is
/// retired, so a later caller sees either the flight or the cached value.
/// Failures are not cached.
pub struct LookupCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> LookupCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_config(CacheConfig::new(ttl))
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: TtlCache::with_config(config),
                flights: Mutex::new(HashMap::new()),
                loads: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    /// Cached value for `key`, or the result of `load` (shared with concurrent callers).
    ///
    /// The caller that starts the flight receives the loader's own error; callers that
    /// joined it receive [`Error::Coalesced`].
    pub async fn get_or_load<F, Fut>(&self, key: &CacheKey, load: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if let Some(v) = self.inner.cache.get(key.as_str()).await {
            return Ok(v);
        }

        let (flight, leader) = {
            let mut flights = self
                .inner
                .flights
                .lock()
                .map_err(|_| Error::runtime("LookupCache flight table poisoned"))?;
            match flights.get(key.as_str()) {
                Some(f) => {
                    self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                    trace!(key = %key, "joining in-flight lookup");
                    (f.clone(), false)
                }
                None => {
                    self.inner.loads.fetch_add(1, Ordering::Relaxed);
                    let flight = self.start_flight(key.as_str().to_string(), load());
                    flights.insert(key.as_str().to_string(), flight.clone());
                    (flight, true)
                }
            }
        };

        let mut waiter = Waiter {
            inner: &self.inner,
            key: key.as_str(),
            flight,
            settled: false,
        };
        let out = (&mut waiter.flight).await;
        waiter.settled = true;

        match out {
            Ok(v) => Ok(v),
            Err(shared) => Err(if leader {
                // Other joiners may still hold the Arc; fall back to a wrapper then.
                Arc::try_unwrap(shared).unwrap_or_else(|shared| Error::Coalesced {
                    key: key.to_string(),
                    source: shared,
                })
            } else {
                Error::Coalesced {
                    key: key.to_string(),
                    source: shared,
                }
            }),
        }
    }

    fn start_flight<Fut>(&self, key: String, load: Fut) -> Flight<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        // Weak: an abandoned flight must not keep the cache (and its sweep) alive.
        let inner: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        async move {
            let out = load.await;
            if let Some(inner) = inner.upgrade() {
                if let Ok(v) = &out {
                    inner.cache.set(key.clone(), v.clone()).await;
                }
                if let Ok(mut flights) = inner.flights.lock() {
                    flights.remove(&key);
                }
            }
            out.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    /// Cached value only; never starts a load.
    pub async fn peek(&self, key: &CacheKey) -> Option<V> {
        self.inner.cache.get(key.as_str()).await
    }

    pub async fn insert(&self, key: CacheKey, value: V) {
        self.inner.cache.set(key, value).await;
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.cache.remove(key.as_str()).await
    }

    pub fn in_flight(&self) -> usize {
        self.inner.flights.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn cache(&self) -> &TtlCache<V> {
        &self.inner.cache
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            cache: self.inner.cache.stats(),
            loads: self.inner.loads.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
        }
    }
}

/// One caller's handle on a flight.
///
/// Dropping the last handle before the flight settles retires the flight, which
/// drops the load future and everything it captured.
struct Waiter<'a, V> {
    inner: &'a Inner<V>,
    key: &'a str,
    flight: Flight<V>,
    settled: bool,
}

impl<V> Drop for Waiter<'_, V> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Ok(mut flights) = self.inner.flights.lock() else {
            return;
        };
        // Joiners clone under this lock, so the count is stable here: the map's
        // copy plus ours means nobody else is waiting.
        let abandoned = match flights.get(self.key) {
            Some(f) => f.ptr_eq(&self.flight) && self.flight.strong_count() <= Some(2),
            None => false,
        };
        if abandoned {
            flights.remove(self.key);
            trace!(key = self.key, "retired abandoned lookup");
        }
    }
}
