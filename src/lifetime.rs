//! Lifetimes: cancellation scopes for running subscriptions.
//!
//! A [`Lifetime`] is owned by exactly one render-context slot. Subscriptions
//! only ever see a [`LifetimeToken`], which can observe the scope and register
//! teardown, but cannot end it.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use uuid::Uuid;

type Teardown = Box<dyn FnOnce() + Send>;

struct Inner {
    id: Uuid,
    cancel: CancellationToken,
    /// Pending teardowns; `None` once the scope has ended.
    teardowns: Mutex<Option<Vec<Teardown>>>,
}

impl Inner {
    fn end(&self) -> bool {
        let teardowns = self
            .teardowns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(teardowns) = teardowns else {
            return false;
        };

        self.cancel.cancel();
        for teardown in teardowns {
            teardown();
        }
        true
    }
}

/// An exclusively owned cancellation scope.
///
/// Ending the lifetime (explicitly or by dropping it) runs every registered
/// teardown exactly once, synchronously, before `end` returns.
pub struct Lifetime {
    inner: Arc<Inner>,
}

impl Lifetime {
    /// Create a new, running lifetime.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                cancel: CancellationToken::new(),
                teardowns: Mutex::new(Some(Vec::new())),
            }),
        }
    }

    /// Create a lifetime together with a token observing it.
    pub fn make() -> (Self, LifetimeToken) {
        let lifetime = Self::new();
        let token = lifetime.token();
        (lifetime, token)
    }

    /// Get a read-only token for subscriptions scoped to this lifetime.
    pub fn token(&self) -> LifetimeToken {
        LifetimeToken {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stable identifier, for logging.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// End the scope. Returns `true` only for the call that actually ended it.
    pub fn end(&self) -> bool {
        let ended = self.inner.end();
        if ended {
            tracing::trace!(lifetime = %self.inner.id, "Lifetime ended");
        }
        ended
    }

    /// Check whether the scope has ended.
    pub fn is_ended(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("id", &self.inner.id)
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Shared, read-only view of a [`Lifetime`].
#[derive(Clone)]
pub struct LifetimeToken {
    inner: Arc<Inner>,
}

impl LifetimeToken {
    /// Identifier of the observed lifetime.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Check whether the observed lifetime has ended.
    pub fn is_ended(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Future that resolves once the observed lifetime ends.
    pub fn ended(&self) -> WaitForCancellationFutureOwned {
        self.inner.cancel.clone().cancelled_owned()
    }

    /// Register a teardown to run when the lifetime ends.
    ///
    /// Runs `teardown` immediately if the lifetime has already ended.
    pub fn on_end(&self, teardown: impl FnOnce() + Send + 'static) {
        let mut teardowns = self
            .inner
            .teardowns
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match teardowns.as_mut() {
            Some(pending) => pending.push(Box::new(teardown)),
            None => {
                drop(teardowns);
                teardown();
            }
        }
    }
}

impl fmt::Debug for LifetimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeToken")
            .field("id", &self.inner.id)
            .field("ended", &self.is_ended())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            let c = Arc::clone(&c);
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[test]
    fn end_is_idempotent() {
        let (count, teardown) = counter();
        let (lifetime, token) = Lifetime::make();
        token.on_end(teardown());

        assert!(lifetime.end());
        assert!(!lifetime.end());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(token.is_ended());
    }

    #[test]
    fn shared_token_tears_down_each_subscription_once() {
        let (count, teardown) = counter();
        let lifetime = Lifetime::new();
        let first = lifetime.token();
        let second = first.clone();
        first.on_end(teardown());
        second.on_end(teardown());

        lifetime.end();
        lifetime.end();
        drop(lifetime);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn teardowns_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let lifetime = Lifetime::new();
        for i in 0..3 {
            let order = Arc::clone(&order);
            lifetime.token().on_end(move || order.lock().unwrap().push(i));
        }
        lifetime.end();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn drop_ends_lifetime() {
        let (count, teardown) = counter();
        let (lifetime, token) = Lifetime::make();
        token.on_end(teardown());

        drop(lifetime);
        assert!(token.is_ended());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_end_after_end_runs_immediately() {
        let (count, teardown) = counter();
        let (lifetime, token) = Lifetime::make();
        lifetime.end();

        token.on_end(teardown());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ended_future_resolves() {
        let (lifetime, token) = Lifetime::make();
        let waiter = tokio::spawn(token.ended());

        lifetime.end();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("ended() should resolve")
            .unwrap();
    }
}
