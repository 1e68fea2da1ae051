//! Per-key single-flight execution.
//!
//! Guarantees at most one in-flight computation per key: concurrent callers
//! for the same key await one shared future and all observe the identical
//! result. Entries are evicted as soon as the computation completes, so
//! freshness policy stays with the caller (the cooldown check against the
//! persisted row).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

type SharedFuture<T> = Shared<BoxFuture<'static, Arc<T>>>;

/// Mutex-guarded map of shared futures keyed by site key.
pub struct SingleFlight<T: Send + Sync + 'static> {
    inflight: Mutex<HashMap<String, SharedFuture<T>>>,
}

impl<T: Send + Sync + 'static> SingleFlight<T> {
    /// Creates an empty map.
    pub fn new() -> SingleFlight<T> {
        SingleFlight {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `make` for the key unless a flight is already up, in which case
    /// the caller joins it. Every caller receives the same `Arc`.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut inflight = self.inflight.lock().await;
            match inflight.get(key) {
                Some(existing) => existing.clone(),
                None => {
                    let flight: SharedFuture<T> =
                        make().map(Arc::new).boxed().shared();
                    inflight.insert(key.to_string(), flight.clone());
                    flight
                }
            }
        };

        let value = flight.clone().await;

        // Evict the completed flight. A caller that raced in just before
        // eviction still holds a clone and resolves to the same value.
        let mut inflight = self.inflight.lock().await;
        if let Some(existing) = inflight.get(key) {
            if existing.ptr_eq(&flight) {
                inflight.remove(key);
            }
        }

        value
    }

    /// Number of flights currently up.
    pub async fn in_flight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl<T: Send + Sync + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        SingleFlight::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let flights = Arc::new(SingleFlight::<usize>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = Arc::clone(&flights);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                flights
                    .run("example.test", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        42
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(*handle.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let flights = SingleFlight::<String>::new();
        let a = flights.run("a.test", || async { "a".to_string() }).await;
        let b = flights.run("b.test", || async { "b".to_string() }).await;
        assert_eq!(*a, "a");
        assert_eq!(*b, "b");
    }

    #[tokio::test]
    async fn test_entries_evicted_after_completion() {
        let flights = SingleFlight::<u32>::new();
        let first = flights.run("k", || async { 1 }).await;
        // The flight completed and was evicted, so a new computation runs.
        let second = flights.run("k", || async { 2 }).await;
        assert_eq!(*first, 1);
        assert_eq!(*second, 2);
    }
}
