//! TitleCache -- LRU of generated titles with duplicate-request collapsing.
//!
//! A miss registers a shared future under the key; callers arriving while it
//! runs attach to it instead of starting their own computation. The shared
//! future normalizes the result and writes it to the LRU itself, so the cache
//! is populated exactly once no matter which caller drives it to completion.
//! Errors and empty titles are never cached.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tracing::debug;

use super::TitleError;

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 80;

/// Default number of cached titles.
pub const DEFAULT_CAPACITY: usize = 10_000;

type InFlight<E> = Shared<BoxFuture<'static, Result<String, E>>>;

/// A running computation plus the number of callers still awaiting it.
struct Pending<E> {
    shared: InFlight<E>,
    waiters: Arc<AtomicUsize>,
}

/// Flatten newlines, strip surrounding whitespace and quoting, cap at 80 chars.
pub fn normalize_title(raw: &str) -> String {
    let flattened = raw.replace(['\r', '\n'], " ");
    let trimmed = flattened
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '-'));
    let truncated: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    truncated.trim_end().to_string()
}

/// Process-wide title cache, shared across concurrent turns.
///
/// Cloning produces a shared view (both maps are `Arc`-backed).
pub struct TitleCache<E = TitleError> {
    entries: Arc<Mutex<LruCache<String, String>>>,
    in_flight: Arc<DashMap<String, Pending<E>>>,
}

impl<E> Clone for TitleCache<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<E> std::fmt::Debug for TitleCache<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TitleCache")
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl<E> TitleCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` titles (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Cached title for `key`, refreshing its recency.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("title cache lock poisoned")
            .get(key)
            .cloned()
    }

    /// Number of cached titles.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("title cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached title for `key`, or compute it once.
    ///
    /// Concurrent misses for the same key share one call of `compute` and
    /// observe the same title or the same error. `compute` is only invoked to
    /// build the future; it must not touch this cache.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>> + Send + 'static,
    {
        if let Some(title) = self.get(key) {
            debug!(key, "title cache hit");
            return Ok(title);
        }

        // Waiter counts only change under the shard lock held by `entry`.
        let (shared, waiters) = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!(key, "joining in-flight title computation");
                let pending = entry.get();
                pending.waiters.fetch_add(1, Ordering::SeqCst);
                (pending.shared.clone(), pending.waiters.clone())
            }
            Entry::Vacant(entry) => {
                // A computation may have finished between the lookup and this entry.
                if let Some(title) = self.get(key) {
                    return Ok(title);
                }
                let shared = self.commit(key.to_string(), compute()).boxed().shared();
                let waiters = Arc::new(AtomicUsize::new(1));
                entry.insert(Pending {
                    shared: shared.clone(),
                    waiters: waiters.clone(),
                });
                (shared, waiters)
            }
        };

        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
            shared: &shared,
            waiters,
        };
        shared.clone().await
    }

    /// Wrap `compute` so that a non-empty normalized result lands in the LRU.
    fn commit<Fut>(&self, key: String, compute: Fut) -> impl Future<Output = Result<String, E>> + Send + 'static
    where
        Fut: Future<Output = Result<String, E>> + Send + 'static,
    {
        let entries = self.entries.clone();
        async move {
            let raw = compute.await?;
            let title = normalize_title(&raw);
            if title.is_empty() {
                return Ok(raw);
            }
            entries
                .lock()
                .expect("title cache lock poisoned")
                .put(key, title.clone());
            Ok(title)
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

/// Releases one waiter on drop. The entry goes away once its computation has
/// finished or the last waiter is gone, so a caller that gives up early never
/// orphans callers still attached to the same computation.
struct InFlightGuard<'a, E>
where
    E: Clone + Send + Sync + 'static,
{
    in_flight: &'a DashMap<String, Pending<E>>,
    key: &'a str,
    shared: &'a InFlight<E>,
    waiters: Arc<AtomicUsize>,
}

impl<E> Drop for InFlightGuard<'_, E>
where
    E: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        let finished = self.shared.peek().is_some();
        self.in_flight.remove_if(self.key, |_, current| {
            Arc::ptr_eq(&current.waiters, &self.waiters)
                && (current.waiters.fetch_sub(1, Ordering::SeqCst) == 1 || finished)
        });
    }
}
