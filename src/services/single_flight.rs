//! Coalesces concurrent work for the same key into one shared future.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;

/// In-flight futures keyed by cache key.
///
/// The first caller for a key starts the work; callers arriving while it is
/// pending await the same future and receive a clone of its output. The
/// entry is removed by whichever waiter observes completion first, so a
/// finished result is never served to later callers.
pub struct SingleFlight<T: Clone> {
    inflight: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `make()` for `key` unless an identical call is already pending.
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut inflight = self.inflight.lock();
            match inflight.get(key) {
                Some(existing) => existing.clone(),
                None => {
                    let shared = make().boxed().shared();
                    inflight.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let output = shared.clone().await;

        let mut inflight = self.inflight.lock();
        if inflight
            .get(key)
            .is_some_and(|current| Shared::ptr_eq(current, &shared))
        {
            inflight.remove(key);
        }
        output
    }

    /// Number of keys with pending work.
    pub fn pending(&self) -> usize {
        self.inflight.lock().len()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
