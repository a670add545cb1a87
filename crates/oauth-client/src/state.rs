//! OAuth `state` parameter issuance and checking
//!
//! Each redirect to the provider carries a fresh random `state`. The provider
//! echoes it back on the callback; a callback whose state we never issued (or
//! issued too long ago) is rejected as a CSRF attempt. A state is single-use.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Maximum age of a pending state before the callback is refused.
pub const STATE_EXPIRY: Duration = Duration::from_secs(600);

/// Upper bound on states awaiting a callback. Past it the oldest is evicted.
pub const MAX_PENDING_STATES: usize = 10_000;

/// Generate a cryptographically random state value.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 chars).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Issued states, indexed for lookup and queued in issue order.
///
/// The queue may still hold states already consumed; those are skipped when
/// they reach the front.
#[derive(Default)]
struct Pending {
    by_state: HashMap<String, Instant>,
    order: VecDeque<(String, Instant)>,
}

impl Pending {
    /// Drop states older than `expiry`. Only the front of the queue is
    /// inspected, so the cost is the number of entries removed.
    fn prune(&mut self, now: Instant, expiry: Duration) {
        while let Some((_, issued)) = self.order.front() {
            if now.duration_since(*issued) < expiry {
                break;
            }
            if let Some((state, _)) = self.order.pop_front() {
                self.by_state.remove(&state);
            }
        }
    }

    /// Make room for one more entry, returning how many live states were
    /// evicted.
    fn make_room(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() >= capacity {
            match self.order.pop_front() {
                Some((state, _)) => {
                    if self.by_state.remove(&state).is_some() {
                        evicted += 1;
                    }
                }
                None => break,
            }
        }
        evicted
    }
}

/// Pending states of redirects that have not come back yet.
pub struct StateStore {
    pending: Mutex<Pending>,
    expiry: Duration,
    capacity: usize,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(STATE_EXPIRY)
    }
}

impl StateStore {
    pub fn new(expiry: Duration) -> Self {
        Self::with_capacity(expiry, MAX_PENDING_STATES)
    }

    pub fn with_capacity(expiry: Duration, capacity: usize) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            expiry,
            capacity: capacity.max(1),
        }
    }

    /// Issue a new state and remember it.
    pub async fn issue(&self) -> String {
        let state = generate_state();
        let now = Instant::now();
        let mut pending = self.pending.lock().await;
        pending.prune(now, self.expiry);
        let evicted = pending.make_room(self.capacity);
        if evicted > 0 {
            warn!(evicted, capacity = self.capacity, "pending OAuth states at capacity");
        }
        pending.by_state.insert(state.clone(), now);
        pending.order.push_back((state.clone(), now));
        debug!(pending = pending.by_state.len(), "issued OAuth state");
        state
    }

    /// Consume a state returned on the callback.
    ///
    /// Returns true only if the state was issued by this store, has not been
    /// consumed or evicted, and is younger than the expiry.
    pub async fn consume(&self, state: &str) -> bool {
        let issued = {
            let mut pending = self.pending.lock().await;
            pending.by_state.remove(state)
        };
        matches!(issued, Some(at) if at.elapsed() < self.expiry)
    }

    /// Number of states awaiting a callback.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.by_state.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
