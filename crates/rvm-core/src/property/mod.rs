#![forbid(unsafe_code)]

//! Reactive property primitives.
//!
//! Each property kind comes as a pair: an owner handle that can publish
//! ([`MutableState`], [`EventEmitter`], [`ConfirmationEventEmitter`]) and a
//! read-only view that can only be observed ([`State`], [`Event`],
//! [`ConfirmationEvent`]). A component keeps the owner handle private and
//! exposes the view. [`Action`] flows the other way (view to component), so
//! it is callable by anyone. [`StateProjection`] has no public write side at
//! all; it is fed by its source.
//!
//! | kind | stores | new subscriber receives |
//! |------|--------|-------------------------|
//! | State | latest value | latest, then updates |
//! | Event | one pending value | the pending value if still undelivered |
//! | ConfirmationEvent | pending until `confirm()` | the pending value |
//! | Action | nothing | only later calls |
//!
//! Every publish is serialized, so concurrent producers never interleave
//! inside a property. Reads of the current value are lock-free snapshots.

mod action;
mod confirmation;
mod event;
mod projection;
mod state;

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

pub use action::Action;
pub use confirmation::{ConfirmationEvent, ConfirmationEventEmitter};
pub use event::{Event, EventEmitter};
pub use projection::StateProjection;
pub use state::{MutableState, State, ValueHook};

use crate::lifecycle::{LiveData, WeakLiveData};
use crate::lock;
use crate::stream::{Observable, Subscription, Value};

/// Debounce applied by [`progress_state`].
pub const DEF_PROGRESS_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(500);

/// Debounce applied by [`debounced_action`] and [`debounced_action_none`].
pub const DEF_ACTION_DEBOUNCE_INTERVAL: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Read-side traits
// ---------------------------------------------------------------------------

/// A property that can be subscribed to.
pub trait ObservableProperty<T: Value> {
    /// Raw stream, including any configured debounce.
    fn observable(&self) -> Observable<T>;

    /// Stream delivered on the main dispatcher, latest-wins.
    fn view_stream(&self) -> Observable<T> {
        self.observable().to_view_stream(None)
    }
}

/// A property the view layer observes through [`LiveData`].
pub trait LiveProperty<T: Value>: ObservableProperty<T> {
    /// Lifecycle-gated holder fed from [`view_stream`](ObservableProperty::view_stream).
    /// Created on first access; later calls return the same instance.
    fn live_data(&self) -> LiveData<T>;
}

/// A property with a readable current value.
pub trait ValueProperty<T: Value> {
    /// Current value, or `None` if nothing was ever set.
    fn value(&self) -> Option<T>;

    fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// Current value for callers that know it is set.
    ///
    /// # Panics
    ///
    /// Panics if the property has no value.
    #[track_caller]
    fn value_non_null(&self) -> T {
        match self.value() {
            Some(value) => value,
            None => panic!("value_non_null called on a property without a value"),
        }
    }

    /// Current value, or `default()` evaluated only when absent.
    fn value_or_else(&self, default: impl FnOnce() -> T) -> T
    where
        Self: Sized,
    {
        self.value().unwrap_or_else(default)
    }

    fn value_or(&self, default: T) -> T
    where
        Self: Sized,
    {
        self.value().unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// A state, optionally seeded and debounced.
pub fn state<T: Value>(initial: Option<T>, debounce: Option<Duration>) -> MutableState<T> {
    MutableState::with_options(initial, debounce, None)
}

/// Boolean state for progress indicators, debounced by
/// [`DEF_PROGRESS_DEBOUNCE_INTERVAL`] so short operations do not flicker.
pub fn progress_state(initial: Option<bool>) -> MutableState<bool> {
    MutableState::with_options(initial, Some(DEF_PROGRESS_DEBOUNCE_INTERVAL), None)
}

pub fn event<T: Value>(debounce: Option<Duration>) -> EventEmitter<T> {
    EventEmitter::new(debounce)
}

pub fn event_none(debounce: Option<Duration>) -> EventEmitter<()> {
    EventEmitter::new(debounce)
}

pub fn confirmation_event<T: Value>(debounce: Option<Duration>) -> ConfirmationEventEmitter<T> {
    ConfirmationEventEmitter::new(debounce)
}

pub fn confirmation_event_none(debounce: Option<Duration>) -> ConfirmationEventEmitter<()> {
    ConfirmationEventEmitter::new(debounce)
}

pub fn action<T: Value>(debounce: Option<Duration>) -> Action<T> {
    Action::new(debounce)
}

pub fn action_none(debounce: Option<Duration>) -> Action<()> {
    Action::new(debounce)
}

/// Action debounced by [`DEF_ACTION_DEBOUNCE_INTERVAL`], for click-like
/// intents that should not fire twice.
pub fn debounced_action<T: Value>() -> Action<T> {
    Action::new(Some(DEF_ACTION_DEBOUNCE_INTERVAL))
}

pub fn debounced_action_none() -> Action<()> {
    Action::new(Some(DEF_ACTION_DEBOUNCE_INTERVAL))
}

// ---------------------------------------------------------------------------
// Live-data plumbing shared by the property kinds
// ---------------------------------------------------------------------------

/// Live data fed by `stream` for as long as the property lives.
pub(crate) fn permanent_live_data<T: Value>(
    cell: &OnceLock<(LiveData<T>, Subscription)>,
    stream: impl FnOnce() -> Observable<T>,
) -> LiveData<T> {
    let (live, _) = cell.get_or_init(|| {
        let live = LiveData::new();
        let feed = live.downgrade();
        let sub = stream().subscribe(move |value| {
            if let Some(live) = feed.upgrade() {
                live.set_value(value);
            }
        });
        (live, sub)
    });
    live.clone()
}

/// Live data that subscribes to `stream` only while it has an active
/// observer. `None` items clear the held value.
pub(crate) fn connected_live_data<T: Value>(
    event_mode: bool,
    stream: Observable<Option<T>>,
) -> LiveData<T> {
    let target: Arc<OnceLock<WeakLiveData<T>>> = Arc::new(OnceLock::new());
    let connection: Arc<Mutex<Option<Subscription>>> = Arc::default();
    let (hook_target, hook_connection) = (Arc::clone(&target), Arc::clone(&connection));
    let live = LiveData::with_hooks(
        event_mode,
        move || {
            let Some(weak) = hook_target.get().cloned() else {
                return;
            };
            let sub = stream.subscribe(move |item| {
                let Some(live) = weak.upgrade() else {
                    return;
                };
                match item {
                    Some(value) => live.set_value(value),
                    None => live.clear_value(),
                }
            });
            let previous = lock(&hook_connection).replace(sub);
            drop(previous);
        },
        move || {
            let sub = lock(&connection).take();
            drop(sub);
        },
    );
    let _ = target.set(live.downgrade());
    live
}
