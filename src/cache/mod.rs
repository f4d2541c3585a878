//! The resolve cache.
//!
//! # Data Flow
//! ```text
//! Request fingerprint
//!     → load: Miss / Fresh / Stale / Expired
//!         Fresh   → reuse URL, refresh `last`
//!         Stale   → cheap revalidation against the freshness result
//!         Expired → full evaluation
//!     → store: last ← now, start set once
//!
//! Background:
//!     GC ticker (period = TTL) removes entries old on both horizons
//! ```
//!
//! # Design Decisions
//! - Per-key atomic replacement plus a periodic sweeper; the workload is
//!   TTL expiry, not capacity pressure
//! - `start` survives stale revalidation so a hot entry still ages out
//! - An empty URL is a valid negative entry and short-circuits repeat 404s

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::logging::LogStream;

/// A previously made resolve decision.
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    /// When the decision was made. Set once by the first store.
    start: Option<Instant>,
    /// Last read/write. Never earlier than `start`.
    last: Option<Instant>,

    pub url: String,
    /// Chosen hostname, kept to accelerate stale revalidation.
    pub resolve: String,
}

impl Resolved {
    pub fn new(url: String, resolve: String) -> Self {
        Self {
            url,
            resolve,
            start: None,
            last: None,
        }
    }

    /// A refreshed copy that keeps this entry's decision time.
    ///
    /// Used by stale revalidation: the URL may be rebuilt, but the entry
    /// keeps aging from the original decision.
    pub fn revalidated(&self, url: String, resolve: String) -> Self {
        Self {
            url,
            resolve,
            start: self.start,
            last: self.last,
        }
    }
}

/// Lifecycle state of a cache entry at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Miss,
    Fresh,
    Stale,
    Expired,
}

/// Concurrent fingerprint → [`Resolved`] map with dual-horizon staleness.
///
/// Cheap to clone; all clones share the same map.
#[derive(Clone)]
pub struct ResolveCache {
    map: Arc<DashMap<String, Resolved>>,
    ttl: Duration,
    gc_log: LogStream,
    ticker_started: Arc<AtomicBool>,
}

impl ResolveCache {
    pub fn new(ttl: Duration, gc_log: LogStream) -> Self {
        Self {
            map: Arc::new(DashMap::new()),
            ttl,
            gc_log,
            ticker_started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Look up a fingerprint and classify the entry's lifecycle state.
    pub fn load(&self, key: &str) -> (Resolved, CacheState) {
        match self.map.get(key) {
            Some(entry) => {
                let value = entry.value().clone();
                let state = self.state_at(&value, Instant::now());
                (value, state)
            }
            None => (Resolved::default(), CacheState::Miss),
        }
    }

    fn state_at(&self, value: &Resolved, now: Instant) -> CacheState {
        let (Some(start), Some(last)) = (value.start, value.last) else {
            return CacheState::Expired;
        };
        if now.duration_since(last) < self.ttl {
            if now.duration_since(start) < self.ttl {
                CacheState::Fresh
            } else {
                CacheState::Stale
            }
        } else {
            CacheState::Expired
        }
    }

    /// Insert or refresh an entry.
    ///
    /// `last` is always advanced to now; `start` is only set when the value
    /// carries none, preserving the original decision time across stale
    /// revalidation.
    pub fn store(&self, key: String, mut value: Resolved) {
        let now = Instant::now();
        if value.start.is_none() {
            value.start = Some(now);
        }
        value.last = Some(now);
        self.map.insert(key, value);
    }

    /// Refresh `last` on a live entry; no-op on miss or expiry.
    pub fn touch(&self, key: &str) {
        let (value, state) = self.load(key);
        match state {
            CacheState::Fresh | CacheState::Stale => self.store(key.to_string(), value),
            CacheState::Miss | CacheState::Expired => {}
        }
    }

    pub fn remove(&self, key: &str) {
        self.map.remove(key);
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove entries that are old on both horizons.
    ///
    /// Entries inside the stale window survive so they can still be cheaply
    /// revalidated.
    pub fn gc(&self, now: Instant) {
        self.gc_log.log("resolve cache GC start");
        self.map.retain(|key, value| {
            let expired = self.state_at(value, now) == CacheState::Expired;
            if expired {
                self.gc_log.log(&format!("resolve cache GC {}: {}", key, value.url));
            }
            !expired
        });
        self.gc_log.log("resolve cache GC done");
    }

    /// Start the background sweep at period TTL. Idempotent; the task stops
    /// when the shutdown channel fires.
    pub fn spawn_gc_ticker(&self, mut shutdown: broadcast::Receiver<()>) {
        if self.ticker_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cache.ttl);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => cache.gc(Instant::now()),
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    #[cfg(test)]
    fn insert_aged(&self, key: &str, mut value: Resolved, start_age: Duration, last_age: Duration) {
        let now = Instant::now();
        value.start = now.checked_sub(start_age);
        value.last = now.checked_sub(last_age);
        self.map.insert(key.to_string(), value);
    }
}
