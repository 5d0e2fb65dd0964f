//! Asynchronous loading cache with single-flight semantics
//!
//! [`AsyncLoadingCache`] is a key→value cache where absent or expired
//! entries are populated by an async loader, with the guarantee that at
//! most one loader runs per key at any time: concurrent callers for the
//! same gap all await the same load and observe the same outcome.
//!
//! Only successful loads are cached. A failed load is delivered to every
//! waiter queued behind it and then forgotten, so the next caller
//! triggers a fresh attempt. Entries carry an absolute expiry instant
//! ([`TimedEntry`]) rather than a relative TTL; callers derive the
//! instant from HTTP cache headers or a configured default.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::error;

use crate::error::{Error, Result};

/// Milliseconds since the Unix epoch.
pub(crate) fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A cached value together with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct TimedEntry<V> {
    value: V,
    expires_at_ms: u64,
}

impl<V> TimedEntry<V> {
    /// Create an entry that expires at `expires_at_ms` (epoch ms).
    pub fn new(value: V, expires_at_ms: u64) -> Self {
        Self {
            value,
            expires_at_ms,
        }
    }

    /// The held value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The expiry instant, in ms since the epoch.
    pub fn expires_at_ms(&self) -> u64 {
        self.expires_at_ms
    }

    /// True if the entry expired before `now_ms`.
    pub fn expired_before(&self, now_ms: u64) -> bool {
        self.expires_at_ms < now_ms
    }

    /// Consume the entry, yielding the value and expiry instant.
    pub fn into_parts(self) -> (V, u64) {
        (self.value, self.expires_at_ms)
    }
}

/// The shared outcome of one loader invocation.
type LoadOutcome<V> = std::result::Result<V, Arc<Error>>;
type SharedLoad<V> = Shared<BoxFuture<'static, LoadOutcome<V>>>;

enum Slot<V> {
    Ready(TimedEntry<V>),
    Pending(SharedLoad<V>),
}

/// Concurrency-safe cache whose entries are populated by async loaders,
/// exactly once per gap.
pub struct AsyncLoadingCache<K, V> {
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
}

impl<K, V> Clone for AsyncLoadingCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K, V> Default for AsyncLoadingCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> AsyncLoadingCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the value for `key`, invoking `loader` if there is no live entry.
    ///
    /// Concurrent callers for the same absent or expired key share a
    /// single loader invocation; the lock guards only the slot map and is
    /// never held while the loader runs. A panicking loader is reported
    /// as [`Error::LoaderPanicked`] and does not poison the cache.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, which is shared verbatim with every
    /// caller that awaited the same load and is not cached.
    pub async fn get<F, Fut>(&self, key: K, loader: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TimedEntry<V>>> + Send + 'static,
    {
        let load = {
            let mut slots = self.slots.lock();
            match slots.get(&key) {
                Some(Slot::Ready(entry)) if !entry.expired_before(now_epoch_ms()) => {
                    return Ok(entry.value().clone());
                }
                Some(Slot::Pending(load)) => load.clone(),
                _ => {
                    let load = Self::start_load(Arc::clone(&self.slots), key.clone(), loader());
                    slots.insert(key, Slot::Pending(load.clone()));
                    load
                }
            }
        };
        // Unwrap the sharing Arc when this caller is the only one left
        // holding the failure.
        load.await
            .map_err(|err| Arc::try_unwrap(err).unwrap_or_else(Error::Shared))
    }

    fn start_load<Fut>(
        slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
        key: K,
        fut: Fut,
    ) -> SharedLoad<V>
    where
        Fut: Future<Output = Result<TimedEntry<V>>> + Send + 'static,
    {
        async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(entry)) => Ok(entry),
                Ok(Err(err)) => Err(Arc::new(err)),
                Err(_) => {
                    error!("cache loader panicked");
                    Err(Arc::new(Error::LoaderPanicked))
                }
            };
            let mut slots = slots.lock();
            match outcome {
                Ok(entry) => {
                    let value = entry.value().clone();
                    slots.insert(key, Slot::Ready(entry));
                    Ok(value)
                }
                Err(err) => {
                    // Forget the failed load so the next caller retries.
                    if matches!(slots.get(&key), Some(Slot::Pending(_))) {
                        slots.remove(&key);
                    }
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// The live value for `key`, if one is cached, without loading.
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready(entry)) if !entry.expired_before(now_epoch_ms()) => {
                Some(entry.value().clone())
            }
            _ => None,
        }
    }

    /// Unconditionally store `value`, bypassing the loader path.
    ///
    /// Used to pre-populate related keys discovered as a side effect of a
    /// load, such as sibling keys found in the same JWKS document.
    pub fn put(&self, key: K, value: V, expires_at_ms: u64) {
        self.slots
            .lock()
            .insert(key, Slot::Ready(TimedEntry::new(value, expires_at_ms)));
    }

    /// True if the cache holds *any* entry for `key`, expired or pending
    /// included. This reports knowledge of the key space, not freshness.
    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.lock().contains_key(key)
    }

    /// A point-in-time snapshot of the keys currently present.
    pub fn keys(&self) -> Vec<K> {
        self.slots.lock().keys().cloned().collect()
    }
}
