//! Key/value cache with per-entry expiry and a periodic background sweep.
//!
//! Reads share a read lock; `set` and the sweep take the write lock. An entry is
//! absent from the moment `now >= expires_at`, whether or not the sweep has
//! removed it yet.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A stored value and its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Stored value.
    pub value: V,
    /// Instant at which the entry stops being visible.
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type Table<V> = Arc<RwLock<HashMap<String, CacheEntry<V>>>>;

/// Background sweeper task and the token that stops it.
struct Sweeper {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// TTL cache shared between request handlers.
pub struct TtlCache<V> {
    entries: Table<V>,
    default_ttl: Duration,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache without a background sweep.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
            sweeper: Mutex::new(None),
        }
    }

    /// Create a cache and start its sweep on `interval`. The sweep also stops
    /// when `shutdown` is cancelled. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(default_ttl: Duration, interval: Duration, shutdown: &CancellationToken) -> Self {
        let cache = Self::new(default_ttl);
        cache.spawn_sweeper(interval, shutdown);
        cache
    }

    /// Value for `key` if present and unexpired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Store `value` until `now + ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Store `value` with the default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove every expired entry and return how many were evicted.
    pub fn purge_expired(&self) -> usize {
        purge(&self.entries)
    }

    /// Stored entries, including expired ones the sweep has not reached yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// TTL used by `set_default`.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Start the periodic sweep, replacing any sweep already running.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: &CancellationToken) {
        let token = shutdown.child_token();
        let entries = Arc::clone(&self.entries);
        let loop_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = purge(&entries);
                        if removed > 0 {
                            debug!(removed = removed, "evicted expired cache entries");
                        }
                    }
                }
            }
            debug!("cache sweeper stopped");
        });

        if let Some(previous) = self.sweeper.lock().replace(Sweeper { token, handle }) {
            previous.token.cancel();
        }
    }

    /// Stop the background sweep and wait for it to exit.
    pub async fn stop_sweeper(&self) {
        let sweeper = self.sweeper.lock().take();
        if let Some(Sweeper { token, handle }) = sweeper {
            token.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "cache sweeper ended abnormally");
            }
        }
    }
}

impl<V> Drop for TtlCache<V> {
    fn drop(&mut self) {
        // Don't join here; just make sure the sweep does not outlive the cache.
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.token.cancel();
        }
    }
}

fn purge<V>(entries: &RwLock<HashMap<String, CacheEntry<V>>>) -> usize {
    let now = Instant::now();
    let mut table = entries.write();
    let before = table.len();
    table.retain(|_, entry| !entry.is_expired(now));
    before - table.len()
}
