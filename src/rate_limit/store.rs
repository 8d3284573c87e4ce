//! # Window Counter Stores
//!
//! Where the rate limiter keeps its per-identity counters. The limiter only
//! talks to the [`WindowStore`] trait, so the in-process map below can be
//! swapped for a store shared between instances without touching the
//! admission logic.
//!
//! ## Locking Pattern:
//! The in-memory store keeps a `RwLock<HashMap<String, Arc<Mutex<WindowState>>>>`.
//! The map lock is only held long enough to find (read) or insert (write) an
//! identity's slot; the counter update itself takes that identity's own
//! mutex, so unrelated callers never wait on each other.
//!
//! Purging only drops a slot nobody else holds. A hit that has already
//! looked up its slot keeps counting in the map, never on an orphan.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Counter and start of the current window for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub count: u32,
    pub window_start: Instant,
}

impl WindowState {
    pub fn has_elapsed(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Backing store for fixed-window counters.
///
/// `hit` must be atomic per key: reset the window if it has elapsed,
/// then count this attempt, and report the resulting state.
#[async_trait]
pub trait WindowStore: Send + Sync {
    async fn hit(&self, key: &str, now: Instant, window: Duration) -> Result<WindowState>;

    /// Drop windows that have elapsed. Returns how many were removed.
    async fn purge_expired(&self, now: Instant, window: Duration) -> Result<usize>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    windows: RwLock<HashMap<String, Arc<Mutex<WindowState>>>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities currently tracked.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.windows.read().map(|w| w.len()).unwrap_or(0)
    }

    fn slot(&self, key: &str, now: Instant) -> Result<Arc<Mutex<WindowState>>> {
        {
            let windows = self
                .windows
                .read()
                .map_err(|_| anyhow!("rate limit store lock poisoned"))?;
            if let Some(slot) = windows.get(key) {
                return Ok(Arc::clone(slot));
            }
        }

        let mut windows = self
            .windows
            .write()
            .map_err(|_| anyhow!("rate limit store lock poisoned"))?;
        let slot = windows.entry(key.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(WindowState {
                count: 0,
                window_start: now,
            }))
        });
        Ok(Arc::clone(slot))
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn hit(&self, key: &str, now: Instant, window: Duration) -> Result<WindowState> {
        let slot = self.slot(key, now)?;
        let mut state = slot
            .lock()
            .map_err(|_| anyhow!("rate limit window lock poisoned for {}", key))?;

        if state.has_elapsed(now, window) {
            state.window_start = now;
            state.count = 0;
        }
        state.count = state.count.saturating_add(1);

        Ok(*state)
    }

    async fn purge_expired(&self, now: Instant, window: Duration) -> Result<usize> {
        let mut windows = self
            .windows
            .write()
            .map_err(|_| anyhow!("rate limit store lock poisoned"))?;
        let before = windows.len();
        windows.retain(|_, slot| {
            // a concurrent hit holds a clone and is about to count on this slot
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.lock() {
                Ok(state) => !state.has_elapsed(now, window),
                Err(_) => false,
            }
        });
        Ok(before - windows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_hits_count_up_within_window() {
        let store = InMemoryWindowStore::new();
        let start = Instant::now();

        for offset in 0..3u32 {
            let now = start + Duration::from_secs(offset as u64);
            let state = store.hit("10.0.0.1", now, WINDOW).await.unwrap();
            assert_eq!(state.count, offset + 1);
            // the window opens at the first hit
            assert_eq!(state.window_start, start);
        }
    }

    #[tokio::test]
    async fn test_window_resets_after_elapsing() {
        let store = InMemoryWindowStore::new();
        let start = Instant::now();
        store.hit("a", start, WINDOW).await.unwrap();
        store.hit("a", start, WINDOW).await.unwrap();

        let later = start + WINDOW;
        let state = store.hit("a", later, WINDOW).await.unwrap();
        assert_eq!(state.count, 1);
        assert_eq!(state.window_start, later);
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let store = InMemoryWindowStore::new();
        let now = Instant::now();
        store.hit("a", now, WINDOW).await.unwrap();
        store.hit("a", now, WINDOW).await.unwrap();
        let b = store.hit("b", now, WINDOW).await.unwrap();
        assert_eq!(b.count, 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_purge_drops_only_elapsed_windows() {
        let store = InMemoryWindowStore::new();
        let start = Instant::now();
        store.hit("old", start, WINDOW).await.unwrap();
        store.hit("fresh", start + Duration::from_secs(30), WINDOW).await.unwrap();

        let removed = store.purge_expired(start + WINDOW, WINDOW).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_slots_in_use() {
        let store = InMemoryWindowStore::new();
        let start = Instant::now();
        store.hit("busy", start, WINDOW).await.unwrap();

        // a hit that has looked up its slot but not yet counted
        let later = start + WINDOW;
        let in_flight = store.slot("busy", later).unwrap();
        assert_eq!(store.purge_expired(later, WINDOW).await.unwrap(), 0);

        // the in-flight slot is still the one in the map, so its count is not lost
        assert!(Arc::ptr_eq(&in_flight, &store.slot("busy", later).unwrap()));
        assert_eq!(store.hit("busy", later, WINDOW).await.unwrap().count, 1);
        assert_eq!(store.hit("busy", later, WINDOW).await.unwrap().count, 2);

        drop(in_flight);
        let removed = store.purge_expired(later + WINDOW, WINDOW).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_hits_are_all_counted() {
        let store = Arc::new(InMemoryWindowStore::new());
        let now = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.hit("shared", now, WINDOW).await.unwrap().count
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            counts.push(handle.await.unwrap());
        }
        counts.sort_unstable();
        assert_eq!(counts, (1..=50).collect::<Vec<u32>>());
    }
}
