#![forbid(unsafe_code)]

//! Fire-once event.
//!
//! # Invariants
//!
//! 1. A value emitted while nobody is subscribed stays pending.
//! 2. The first subscription made while a value is pending receives it and
//!    clears the pending flag.
//! 3. A subscription made after the value was delivered skips it and only
//!    receives later emissions.
//!
//! The pending flag is shared by all subscriptions. Delivery guarantees are
//! only meaningful with one subscriber at a time; with several, each still
//! receives new emissions, but which of them "consumes" a pending value is
//! not specified.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{LiveProperty, ObservableProperty, connected_live_data};
use crate::lifecycle::LiveData;
use crate::stream::{BehaviorSubject, Observable, Value};

struct EventCore<T> {
    subject: BehaviorSubject<T>,
    pending: Arc<AtomicBool>,
    observable: Observable<T>,
    live: OnceLock<LiveData<T>>,
}

/// Owner handle of an event: can emit.
pub struct EventEmitter<T> {
    core: Arc<EventCore<T>>,
}

/// Observe-only view of an event.
pub struct Event<T> {
    core: Arc<EventCore<T>>,
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Value> EventEmitter<T> {
    #[must_use]
    pub fn new(debounce: Option<Duration>) -> Self {
        let subject = BehaviorSubject::new(None);
        let pending = Arc::new(AtomicBool::new(false));
        let observable = {
            let subject = subject.clone();
            let pending = Arc::clone(&pending);
            Observable::defer(move || {
                let already_delivered = !pending.load(Ordering::Acquire) && subject.has_value();
                let pending = Arc::clone(&pending);
                subject
                    .observable()
                    .skip(usize::from(already_delivered))
                    .do_on_next(move |_| pending.store(false, Ordering::Release))
            })
            .debounce_opt(debounce)
        };
        Self {
            core: Arc::new(EventCore {
                subject,
                pending,
                observable,
                live: OnceLock::new(),
            }),
        }
    }

    /// Mark pending and publish.
    pub fn emit(&self, value: T) {
        self.core.pending.store(true, Ordering::Release);
        self.core.subject.next(value);
    }

    /// A callable that emits into this event.
    pub fn consumer(&self) -> impl Fn(T) + Send + Sync + 'static {
        let event = self.clone();
        move |value| event.emit(value)
    }

    #[must_use]
    pub fn read_only(&self) -> Event<T> {
        Event {
            core: Arc::clone(&self.core),
        }
    }
}

impl EventEmitter<()> {
    /// Emit for payload-less events.
    pub fn trigger(&self) {
        self.emit(());
    }
}

impl<T> EventCore<T> {
    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl<T: Value> Event<T> {
    /// Whether an emitted value is still waiting for its first subscriber.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.core.is_pending()
    }
}

impl<T: Value> EventEmitter<T> {
    /// Whether an emitted value is still waiting for its first subscriber.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.core.is_pending()
    }
}

fn event_live_data<T: Value>(core: &EventCore<T>, stream: Observable<T>) -> LiveData<T> {
    core.live
        .get_or_init(|| connected_live_data(true, stream.map(Some)))
        .clone()
}

impl<T: Value> ObservableProperty<T> for EventEmitter<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable.clone()
    }
}

impl<T: Value> ObservableProperty<T> for Event<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable.clone()
    }
}

impl<T: Value> LiveProperty<T> for EventEmitter<T> {
    fn live_data(&self) -> LiveData<T> {
        event_live_data(&self.core, self.view_stream())
    }
}

impl<T: Value> LiveProperty<T> for Event<T> {
    fn live_data(&self) -> LiveData<T> {
        event_live_data(&self.core, self.view_stream())
    }
}

impl<T: Value> From<&EventEmitter<T>> for Event<T> {
    fn from(event: &EventEmitter<T>) -> Self {
        event.read_only()
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("pending", &self.core.is_pending())
            .finish()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("pending", &self.core.is_pending())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
