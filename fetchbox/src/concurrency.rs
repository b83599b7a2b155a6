use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use fetchbox_core::{CacheKey, FetchError, Response, TransportError};
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::Shared;
use lru::LruCache;
use tracing::debug;

/// Outcome of one call, broadcast to the owner and every waiter.
pub type SharedOutcome = Result<Response, FetchError>;

/// Result of a concurrency check.
pub enum ConcurrencyDecision {
    /// This caller owns the call and must resolve the permit.
    Proceed(InFlightPermit),
    /// Another caller owns the call; await its outcome.
    Await(PendingResult),
}

impl fmt::Debug for ConcurrencyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyDecision::Proceed(_) => f.write_str("ConcurrencyDecision::Proceed"),
            ConcurrencyDecision::Await(_) => f.write_str("ConcurrencyDecision::Await"),
        }
    }
}

/// Trait for coalescing concurrent requests for the same key.
pub trait ConcurrencyManager: Send + Sync {
    /// Decides whether the caller owns the call for `cache_key` or awaits
    /// another caller's outcome.
    ///
    /// Must not suspend: two callers checking the same key can never both
    /// get [`ConcurrencyDecision::Proceed`] while the first permit is alive.
    fn check(&self, cache_key: &CacheKey) -> ConcurrencyDecision;
}

/// Clonable handle on an in-flight call's outcome.
///
/// Resolves once, with the same outcome for every clone. If the owner goes
/// away without resolving, it yields [`TransportError::Cancelled`].
#[derive(Clone)]
pub struct PendingResult {
    inner: Shared<oneshot::Receiver<SharedOutcome>>,
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult").finish_non_exhaustive()
    }
}

impl Future for PendingResult {
    type Output = SharedOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner
            .poll_unpin(cx)
            .map(|received| received.unwrap_or_else(|_| Err(TransportError::Cancelled.into())))
    }
}

type Slots = Arc<Mutex<LruCache<CacheKey, Slot>>>;

struct Slot {
    id: u64,
    pending: PendingResult,
}

fn lock(slots: &Slots) -> MutexGuard<'_, LruCache<CacheKey, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ownership of an in-flight call.
///
/// Resolve it with [`complete`](Self::complete). Dropping it unresolved
/// releases the key and wakes waiters with [`TransportError::Cancelled`].
pub struct InFlightPermit {
    key: CacheKey,
    id: u64,
    sender: Option<oneshot::Sender<SharedOutcome>>,
    slots: Option<Slots>,
}

impl fmt::Debug for InFlightPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightPermit")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("resolved", &self.sender.is_none())
            .finish()
    }
}

impl InFlightPermit {
    /// A permit that is not registered anywhere; completing it is a no-op.
    pub fn detached(key: CacheKey) -> Self {
        InFlightPermit {
            key,
            id: 0,
            sender: None,
            slots: None,
        }
    }

    /// The key this permit owns.
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Releases the key and hands `outcome` to every waiter.
    ///
    /// The slot is removed before anyone is woken, so a caller that sees the
    /// outcome and retries starts a fresh call. Returns `outcome` to the owner.
    pub fn complete(mut self, outcome: SharedOutcome) -> SharedOutcome {
        self.release();
        if let Some(sender) = self.sender.take() {
            // Nobody is listening once the slot and every waiter are gone.
            if !sender.is_canceled() {
                let _ = sender.send(outcome.clone());
            }
        }
        outcome
    }

    fn release(&mut self) {
        if let Some(slots) = self.slots.take() {
            let mut slots = lock(&slots);
            if slots.peek(&self.key).is_some_and(|slot| slot.id == self.id) {
                slots.pop(&self.key);
            }
        }
    }
}

impl Drop for InFlightPermit {
    fn drop(&mut self) {
        if self.sender.is_some() {
            debug!(key = %self.key, "in-flight call dropped before completion");
        }
        self.release();
    }
}

/// Process-local registry of in-flight calls, one slot per key.
///
/// Holds at most `capacity` slots. Slots are kept in creation order and the
/// oldest is evicted when a new key arrives at capacity; the evicted call
/// keeps running and its existing waiters still get its outcome, but new
/// requests for that key no longer join it.
pub struct InFlightRegistry {
    slots: Slots,
    next_id: AtomicU64,
}

impl fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl InFlightRegistry {
    /// Creates a registry holding at most `capacity` distinct keys.
    pub fn new(capacity: NonZeroUsize) -> Self {
        InFlightRegistry {
            slots: Arc::new(Mutex::new(LruCache::new(capacity))),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of keys currently in flight.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    /// `true` when nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of keys tracked at once.
    pub fn capacity(&self) -> NonZeroUsize {
        lock(&self.slots).cap()
    }
}

impl ConcurrencyManager for InFlightRegistry {
    fn check(&self, cache_key: &CacheKey) -> ConcurrencyDecision {
        let mut slots = lock(&self.slots);
        // `peek` leaves the order alone, so eviction follows creation order.
        if let Some(slot) = slots.peek(cache_key) {
            return ConcurrencyDecision::Await(slot.pending.clone());
        }

        let (sender, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending = PendingResult {
            inner: receiver.shared(),
        };
        if let Some((evicted, _)) = slots.push(cache_key.clone(), Slot { id, pending }) {
            debug!(key = %evicted, "in-flight registry full, evicted oldest key");
        }

        ConcurrencyDecision::Proceed(InFlightPermit {
            key: cache_key.clone(),
            id,
            sender: Some(sender),
            slots: Some(self.slots.clone()),
        })
    }
}

/// Manager that never deduplicates: every caller owns its own call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopConcurrencyManager;

impl ConcurrencyManager for NoopConcurrencyManager {
    fn check(&self, cache_key: &CacheKey) -> ConcurrencyDecision {
        ConcurrencyDecision::Proceed(InFlightPermit::detached(cache_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn registry(capacity: usize) -> InFlightRegistry {
        InFlightRegistry::new(NonZeroUsize::new(capacity).expect("non-zero"))
    }

    fn proceed(decision: ConcurrencyDecision) -> InFlightPermit {
        match decision {
            ConcurrencyDecision::Proceed(permit) => permit,
            ConcurrencyDecision::Await(_) => panic!("expected to own the call"),
        }
    }

    fn wait(decision: ConcurrencyDecision) -> PendingResult {
        match decision {
            ConcurrencyDecision::Await(pending) => pending,
            ConcurrencyDecision::Proceed(_) => panic!("expected to await"),
        }
    }

    #[tokio::test]
    async fn second_caller_awaits_first_outcome() {
        let registry = registry(8);
        let key = CacheKey::from("a");
        let permit = proceed(registry.check(&key));
        let pending = wait(registry.check(&key));
        let other = pending.clone();

        let outcome = permit.complete(Ok(Response::with_status(StatusCode::OK, "body")));
        assert!(outcome.is_ok());
        assert!(registry.is_empty());

        for waiter in [pending, other] {
            let response = waiter.await.expect("shared success");
            assert_eq!(response.body().as_ref(), b"body");
        }
    }

    #[tokio::test]
    async fn dropped_owner_cancels_waiters_and_frees_key() {
        let registry = registry(8);
        let key = CacheKey::from("a");
        let permit = proceed(registry.check(&key));
        let pending = wait(registry.check(&key));

        drop(permit);

        assert!(matches!(
            pending.await,
            Err(FetchError::Transport(TransportError::Cancelled))
        ));
        assert!(registry.is_empty());
        let _fresh_owner = proceed(registry.check(&key));
    }

    #[tokio::test]
    async fn eviction_keeps_evicted_call_alive() {
        let registry = registry(1);
        let a = CacheKey::from("a");
        let b = CacheKey::from("b");

        let owner_a = proceed(registry.check(&a));
        let waiter_a = wait(registry.check(&a));
        let owner_b = proceed(registry.check(&b));
        assert_eq!(registry.len(), 1);

        // `a` was evicted: a new caller owns a second call for it.
        let second_a = proceed(registry.check(&a));

        // The first `a` completing must not remove the second `a` slot.
        owner_a.complete(Ok(Response::with_status(StatusCode::OK, "first")));
        assert_eq!(waiter_a.await.expect("ok").body().as_ref(), b"first");
        assert_eq!(registry.len(), 1);

        drop(owner_b);
        second_a.complete(Ok(Response::with_status(StatusCode::OK, "second")));
        assert!(registry.is_empty());
    }

    #[test]
    fn noop_manager_always_proceeds() {
        let key = CacheKey::from("a");
        let first = proceed(NoopConcurrencyManager.check(&key));
        let _second = proceed(NoopConcurrencyManager.check(&key));
        assert!(first.complete(Err(TransportError::Timeout.into())).is_err());
    }
}
