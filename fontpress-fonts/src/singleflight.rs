//! Request coalescing: concurrent calls for the same key share one execution.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

/// Map from key to a shared once-cell.
///
/// The first caller for a key runs the work; callers arriving while it is in
/// flight await the same cell and receive a clone of its value. The entry is
/// removed once the work completes, so a later call starts fresh.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key` unless a run is already in flight, in which case
    /// wait for it and share its result.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut calls = self.calls.lock();
            Arc::clone(calls.entry(key.clone()).or_default())
        };

        let value = cell.get_or_init(work).await.clone();

        let mut calls = self.calls.lock();
        if calls.get(&key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            calls.remove(&key);
        }
        value
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_calls_share_one_run() {
        let flight: SingleFlight<&str, usize> = SingleFlight::new();
        let runs = AtomicUsize::new(0);
        let work = || async {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            42
        };

        let (a, b, c) = tokio::join!(
            flight.run("k", work),
            flight.run("k", work),
            flight.run("k", work)
        );
        assert_eq!((a, b, c), (42, 42, 42));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_separately() {
        let flight: SingleFlight<u32, u32> = SingleFlight::new();
        let (a, b) = tokio::join!(flight.run(1, || async { 10 }), flight.run(2, || async { 20 }));
        assert_eq!((a, b), (10, 20));
    }

    #[tokio::test]
    async fn test_sequential_calls_rerun() {
        let flight: SingleFlight<(), usize> = SingleFlight::new();
        let runs = AtomicUsize::new(0);
        for _ in 0..3 {
            flight
                .run((), || async { runs.fetch_add(1, Ordering::SeqCst) })
                .await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_errors_are_shared() {
        let flight: SingleFlight<&str, Result<u8, Arc<String>>> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flight.run("k", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(Arc::new("boom".to_string()))
            }),
            flight.run("k", || async { Ok(1) })
        );
        assert_eq!(a, Err(Arc::new("boom".to_string())));
        assert_eq!(b, a);
    }
}
