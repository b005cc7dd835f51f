//! Request coalescing (single-flight)
//!
//! Concurrent callers asking for the same key share one in-flight
//! computation and receive a clone of its result. The in-flight record is
//! dropped as soon as the computation finishes, so nothing is cached here;
//! a later call for the same key always runs again.

use std::{
    collections::HashMap,
    fmt,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

const METRIC_COALESCED_WAITERS: &str = "lodestar_coalesced_waiters_total";

type Slot<T, E> = Option<Result<T, E>>;

struct Flight<T, E> {
    token: u64,
    result: watch::Receiver<Slot<T, E>>,
}

enum Role<T, E> {
    Leader {
        token: u64,
        publish: watch::Sender<Slot<T, E>>,
    },
    Follower(watch::Receiver<Slot<T, E>>),
}

/// Collapses concurrent duplicate work per key
pub struct RequestCoalescer<T, E> {
    name: &'static str,
    next_token: AtomicU64,
    flights: Mutex<HashMap<String, Flight<T, E>>>,
}

impl<T, E> fmt::Debug for RequestCoalescer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("name", &self.name)
            .field("in_flight", &self.flights.lock().len())
            .finish()
    }
}

impl<T, E> RequestCoalescer<T, E>
where
    T: Clone + Send + Sync,
    E: Clone + Send + Sync,
{
    /// Create a coalescer; `name` labels its metrics
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_token: AtomicU64::new(1),
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` for `key`, or wait for the computation already in flight
    ///
    /// Waiting callers never invoke their own `f` unless the leading caller
    /// is dropped before finishing; then one of them takes over.
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (token, publish) = loop {
            match self.join_or_lead(key) {
                Role::Leader { token, publish } => break (token, publish),
                Role::Follower(result) => {
                    metrics::counter!(METRIC_COALESCED_WAITERS, "coalescer" => self.name)
                        .increment(1);
                    trace!(coalescer = self.name, "attached to in-flight request");
                    if let Some(result) = wait_for(result).await {
                        return result;
                    }
                    trace!(coalescer = self.name, "leader abandoned request, retrying");
                },
            }
        };

        let guard = FlightGuard {
            flights: &self.flights,
            key,
            token,
        };
        let result = f().await;
        drop(guard);
        publish.send_replace(Some(result.clone()));
        result
    }

    /// Number of keys with a computation in flight
    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    fn join_or_lead(&self, key: &str) -> Role<T, E> {
        let mut flights = self.flights.lock();
        if let Some(flight) = flights.get(key) {
            return Role::Follower(flight.result.clone());
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (publish, result) = watch::channel(None);
        flights.insert(key.to_string(), Flight { token, result });
        Role::Leader { token, publish }
    }
}

/// Wait for the leader's result; `None` if the leader went away without one
async fn wait_for<T: Clone, E: Clone>(mut result: watch::Receiver<Slot<T, E>>) -> Slot<T, E> {
    loop {
        let current: Slot<T, E> = result.borrow_and_update().clone();
        if current.is_some() {
            return current;
        }
        if result.changed().await.is_err() {
            return result.borrow().clone();
        }
    }
}

/// Removes the in-flight record when the leader finishes or is dropped
struct FlightGuard<'a, T, E> {
    flights: &'a Mutex<HashMap<String, Flight<T, E>>>,
    key: &'a str,
    token: u64,
}

impl<T, E> Drop for FlightGuard<'_, T, E> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        if flights.get(self.key).is_some_and(|f| f.token == self.token) {
            flights.remove(self.key);
        }
    }
}
