#![forbid(unsafe_code)]

//! Host lifecycle model.
//!
//! The hosting UI framework drives a [`Lifecycle`] through
//! [`LifecycleEvent`]s. Everything in this crate that cares about "is the
//! view visible" or "has the component been torn down" reads it from here.
//!
//! # Invariants
//!
//! 1. States are ordered `Destroyed < Initialized < Created < Started < Resumed`.
//! 2. `Destroyed` is terminal: later events are ignored.
//! 3. Observers are notified after the state has changed, outside any lock,
//!    in registration order.
//! 4. All observers are dropped once `Destroyed` has been delivered.

pub mod live;

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

pub use live::{LiveData, WeakLiveData};

use crate::lock;
use crate::stream::Subscription;

/// Stage of a lifecycle owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Destroyed = 0,
    Initialized = 1,
    Created = 2,
    Started = 3,
    Resumed = 4,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Destroyed,
            1 => Self::Initialized,
            2 => Self::Created,
            3 => Self::Started,
            _ => Self::Resumed,
        }
    }

    /// Whether this stage is `other` or later.
    #[must_use]
    pub fn is_at_least(self, other: LifecycleState) -> bool {
        self >= other
    }
}

/// Transition reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    /// The stage an owner is in right after this event.
    #[must_use]
    pub const fn target_state(self) -> LifecycleState {
        match self {
            Self::Create | Self::Stop => LifecycleState::Created,
            Self::Start | Self::Pause => LifecycleState::Started,
            Self::Resume => LifecycleState::Resumed,
            Self::Destroy => LifecycleState::Destroyed,
        }
    }
}

type LifecycleCallback = Arc<dyn Fn(LifecycleState, LifecycleEvent) + Send + Sync>;

struct LifecycleInner {
    state: AtomicU8,
    observers: Mutex<Vec<(u64, LifecycleCallback)>>,
    next_id: AtomicU64,
}

impl LifecycleInner {
    fn remove(&self, id: u64) {
        let removed: Vec<(u64, LifecycleCallback)> = {
            let mut observers = lock(&self.observers);
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *observers)
                .into_iter()
                .partition(|(oid, _)| *oid == id);
            *observers = kept;
            gone
        };
        drop(removed);
    }
}

/// Shared, host-driven lifecycle. Clones observe the same stage.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Lifecycle {
    /// A fresh lifecycle in [`LifecycleState::Initialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(LifecycleState::Initialized)
    }

    /// A lifecycle that is already over. Observers attached to it are
    /// ignored.
    #[must_use]
    pub fn destroyed() -> Self {
        Self::with_state(LifecycleState::Destroyed)
    }

    fn with_state(state: LifecycleState) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                state: AtomicU8::new(state as u8),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn current_state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Started or resumed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_state().is_at_least(LifecycleState::Started)
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.current_state() == LifecycleState::Destroyed
    }

    /// Whether both handles refer to the same lifecycle.
    #[must_use]
    pub fn ptr_eq(&self, other: &Lifecycle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Apply a host transition and notify observers.
    pub fn handle_event(&self, event: LifecycleEvent) {
        let target = event.target_state();
        let previous = self.inner.state.swap(target as u8, Ordering::AcqRel);
        if previous == LifecycleState::Destroyed as u8 {
            self.inner
                .state
                .store(LifecycleState::Destroyed as u8, Ordering::Release);
            tracing::trace!(?event, "event after destroy ignored");
            return;
        }
        tracing::debug!(
            ?event,
            from = ?LifecycleState::from_u8(previous),
            to = ?target,
            "lifecycle transition"
        );
        let observers: Vec<LifecycleCallback> = lock(&self.inner.observers)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in observers {
            cb(target, event);
        }
        if target == LifecycleState::Destroyed {
            let dropped = std::mem::take(&mut *lock(&self.inner.observers));
            drop(dropped);
        }
    }

    /// Be told about every later transition. Nothing is registered on a
    /// destroyed lifecycle.
    pub fn add_observer(
        &self,
        observer: impl Fn(LifecycleState, LifecycleEvent) + Send + Sync + 'static,
    ) -> Subscription {
        if self.is_destroyed() {
            return Subscription::empty();
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.observers).push((id, Arc::new(observer)));
        let weak: Weak<LifecycleInner> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.inner.observers).len()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.current_state())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Anything that exposes a [`Lifecycle`].
pub trait LifecycleOwner {
    fn lifecycle(&self) -> Lifecycle;
}

impl LifecycleOwner for Lifecycle {
    fn lifecycle(&self) -> Lifecycle {
        self.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
