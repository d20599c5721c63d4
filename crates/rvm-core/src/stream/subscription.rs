#![forbid(unsafe_code)]

//! Cancellation handles for stream subscriptions.
//!
//! A [`Subscription`] is an RAII guard: dropping it (or calling
//! [`Disposable::dispose`]) runs its teardown exactly once. A
//! [`SubscriptionHandle`] observes and cancels the same subscription without
//! owning it, so it can be handed out while the owning guard sits in a
//! [`DisposableStore`](crate::dispose::DisposableStore).
//!
//! # Invariants
//!
//! 1. The teardown closure runs at most once, whichever path disposes first.
//! 2. `is_disposed()` is `true` before the teardown starts running.
//! 3. Disposing twice is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Anything that can be cancelled and asked whether it has been.
///
/// Implemented by [`Subscription`] and [`SubscriptionHandle`]; the
/// auto-disposal registry stores values of this trait.
pub trait Disposable: Send + Sync {
    /// Cancel the resource. Idempotent.
    fn dispose(&self);

    /// Whether [`dispose`](Self::dispose) has been called.
    fn is_disposed(&self) -> bool;
}

type Teardown = Box<dyn FnOnce() + Send>;

struct Inner {
    disposed: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
}

impl Inner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let teardown = self
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

/// Owning cancellation guard. Disposes on drop.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` when disposed.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                teardown: Mutex::new(None),
            }),
        }
    }

    /// Combine several subscriptions; disposing the result disposes each of
    /// them in order.
    pub fn composite(parts: Vec<Subscription>) -> Self {
        Self::new(move || {
            for part in parts {
                part.dispose();
            }
        })
    }

    /// A non-owning handle to this subscription.
    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Cancel now. Same as dropping, but usable through a shared reference.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether this subscription has been cancelled.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Disposable for Subscription {
    fn dispose(&self) {
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        Subscription::is_disposed(self)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Cloneable, non-owning view of a [`Subscription`].
///
/// Dropping a handle does nothing; [`dispose`](Disposable::dispose) cancels
/// the underlying subscription.
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<Inner>,
}

impl Disposable for SubscriptionHandle {
    fn dispose(&self) {
        self.inner.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
