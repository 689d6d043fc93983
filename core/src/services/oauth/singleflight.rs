//! Keyed coalescing of concurrent async calls.
//!
//! Concurrent callers sharing a key attach to the call already in flight
//! and receive a clone of its result. The underlying future runs on a
//! detached task, so no caller cancellation (not even the caller that
//! started the flight) aborts work others are waiting on. The key is
//! released when the flight completes, so a later call starts a fresh
//! one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

type FlightMap<T> = Arc<Mutex<HashMap<String, watch::Receiver<Option<T>>>>>;

/// Coalesces concurrent calls with the same key into a single execution.
pub struct Group<T> {
    flights: FlightMap<T>,
}

impl<T> Default for Group<T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Releases the flight key when the executing task finishes, normally or
/// by panic.
struct KeyGuard<T> {
    flights: FlightMap<T>,
    key: String,
}

impl<T> Drop for KeyGuard<T> {
    fn drop(&mut self) {
        self.flights
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

impl<T: Clone + Send + Sync + 'static> Group<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` under `key`, or attach to the flight already running under
    /// it.
    ///
    /// Returns `None` only if the executing task aborted without
    /// producing a value (a panic inside `f`, contained to the detached
    /// task).
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (mut rx, lead) = {
            let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
            match flights.get(key) {
                Some(rx) => (rx.clone(), None),
                None => {
                    let (tx, rx) = watch::channel(None);
                    flights.insert(key.to_string(), rx.clone());
                    (rx, Some(tx))
                }
            }
        };

        if let Some(tx) = lead {
            let guard = KeyGuard {
                flights: Arc::clone(&self.flights),
                key: key.to_string(),
            };
            let fut = f();
            tokio::spawn(async move {
                let result = fut.await;
                drop(guard);
                let _ = tx.send(Some(result));
            });
        }

        loop {
            {
                let current = rx.borrow_and_update();
                if let Some(value) = current.as_ref() {
                    return Some(value.clone());
                }
            }
            if rx.changed().await.is_err() {
                // Sender dropped without a value: the flight panicked.
                return rx.borrow().as_ref().cloned();
            }
        }
    }
}
