//! Single-value TTL cache with coalesced refresh
//!
//! Readers never block each other while the entry is fresh. Once stale,
//! the first caller refreshes under a mutex; callers that queued behind it
//! see the generation move and reuse its result instead of fetching again.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::Result;

struct Cached<T> {
    value: Arc<T>,
    fetched_at: Instant,
}

/// Lazily refreshed value with a fixed TTL
pub struct TtlCell<T> {
    name: &'static str,
    ttl: Duration,
    entry: RwLock<Option<Cached<T>>>,
    refresh: Mutex<()>,
    generation: AtomicU64,
}

impl<T> TtlCell<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of successful refreshes so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Cached value regardless of age
    pub async fn peek(&self) -> Option<Arc<T>> {
        self.entry.read().await.as_ref().map(|c| c.value.clone())
    }

    /// Mark the entry stale so the next access refreshes
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    /// Return the cached value if its age is within the TTL, otherwise
    /// refresh it with `fetch`. Concurrent stale readers share one fetch.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let observed = {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref() {
                if cached.fetched_at.elapsed() <= self.ttl {
                    return Ok(cached.value.clone());
                }
            }
            self.generation.load(Ordering::SeqCst)
        };

        let _refresh = self.refresh.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            if let Some(cached) = self.entry.read().await.as_ref() {
                debug!(cache = %self.name, "Reusing concurrent refresh");
                return Ok(cached.value.clone());
            }
        }

        let value = Arc::new(fetch().await?);
        *self.entry.write().await = Some(Cached {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(cache = %self.name, generation, "Cache refreshed");

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let cell = TtlCell::new("test", Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..5 {
            let value = cell
                .get_or_refresh(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7u32)
                })
                .await
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_refreshes_once_per_window() {
        let cell = TtlCell::new("test", Duration::from_millis(20));
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            Ok(calls.fetch_add(1, Ordering::SeqCst))
        };

        assert_eq!(*cell.get_or_refresh(fetch).await.unwrap(), 0);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(*cell.get_or_refresh(fetch).await.unwrap(), 1);
        assert_eq!(*cell.get_or_refresh(fetch).await.unwrap(), 1);
        assert_eq!(cell.generation(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_stale_readers_coalesce() {
        let cell = Arc::new(TtlCell::new("test", Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let cell = cell.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cell.get_or_refresh(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok("flags".to_string())
                    })
                    .await
                    .unwrap()
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            assert_eq!(result.unwrap().as_str(), "flags");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cell.generation(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_nothing() {
        let cell: TtlCell<u32> = TtlCell::new("test", Duration::from_secs(60));
        let err = cell
            .get_or_refresh(|| async { Err(Error::Transport("down".to_string())) })
            .await;
        assert!(err.is_err());
        assert!(cell.peek().await.is_none());
        assert_eq!(cell.generation(), 0);

        assert_eq!(*cell.get_or_refresh(|| async { Ok(3) }).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cell = TtlCell::new("test", Duration::from_secs(60));
        cell.get_or_refresh(|| async { Ok(1u8) }).await.unwrap();
        cell.invalidate().await;
        assert_eq!(*cell.get_or_refresh(|| async { Ok(2u8) }).await.unwrap(), 2);
    }
}
