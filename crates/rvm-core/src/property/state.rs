#![forbid(unsafe_code)]

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{LiveProperty, ObservableProperty, ValueProperty, permanent_live_data};
use crate::lifecycle::LiveData;
use crate::stream::{BehaviorSubject, Observable, Subscription, Value};

/// Transform applied to every value before it is stored, e.g. input
/// formatting.
pub type ValueHook<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

struct StateCore<T> {
    subject: BehaviorSubject<T>,
    observable: Observable<T>,
    hook: Option<ValueHook<T>>,
    live: OnceLock<(LiveData<T>, Subscription)>,
}

/// Owner handle of a state: can publish.
///
/// Clones share the same state. Hand out [`read_only`](Self::read_only)
/// views to code that should only observe.
pub struct MutableState<T> {
    core: Arc<StateCore<T>>,
}

/// Read-only view of a [`MutableState`].
pub struct State<T> {
    core: Arc<StateCore<T>>,
}

impl<T> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Value> MutableState<T> {
    /// Undebounced state with an optional seed.
    #[must_use]
    pub fn new(initial: Option<T>) -> Self {
        Self::with_options(initial, None, None)
    }

    /// Full constructor.
    ///
    /// `debounce` applies to the observable stream only: `value()` always
    /// returns the newest published value. `hook` runs on every published
    /// value (not on `initial`).
    #[must_use]
    pub fn with_options(
        initial: Option<T>,
        debounce: Option<Duration>,
        hook: Option<ValueHook<T>>,
    ) -> Self {
        let subject = BehaviorSubject::new(initial);
        let observable = subject.observable().debounce_opt(debounce);
        Self {
            core: Arc::new(StateCore {
                subject,
                observable,
                hook,
                live: OnceLock::new(),
            }),
        }
    }

    /// Publish unconditionally, through the value hook if one is set.
    pub fn set(&self, value: T) {
        let value = match &self.core.hook {
            Some(hook) => hook(value),
            None => value,
        };
        self.core.subject.next(value);
    }

    /// Publish only if `value` differs from the current value.
    pub fn set_if_changed(&self, value: T)
    where
        T: PartialEq,
    {
        if self.core.subject.value().as_ref() != Some(&value) {
            self.set(value);
        }
    }

    /// A callable that publishes into this state.
    pub fn consumer(&self) -> impl Fn(T) + Send + Sync + 'static {
        let state = self.clone();
        move |value| state.set(value)
    }

    /// Read-only view sharing this state.
    #[must_use]
    pub fn read_only(&self) -> State<T> {
        State {
            core: Arc::clone(&self.core),
        }
    }

    /// Number of live stream subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.subject.observer_count()
    }
}

impl<T: Value> ObservableProperty<T> for MutableState<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable.clone()
    }
}

impl<T: Value> ObservableProperty<T> for State<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable.clone()
    }
}

impl<T: Value> LiveProperty<T> for MutableState<T> {
    fn live_data(&self) -> LiveData<T> {
        permanent_live_data(&self.core.live, || self.view_stream())
    }
}

impl<T: Value> LiveProperty<T> for State<T> {
    fn live_data(&self) -> LiveData<T> {
        permanent_live_data(&self.core.live, || self.view_stream())
    }
}

impl<T: Value> ValueProperty<T> for MutableState<T> {
    fn value(&self) -> Option<T> {
        self.core.subject.value()
    }

    fn has_value(&self) -> bool {
        self.core.subject.has_value()
    }
}

impl<T: Value> ValueProperty<T> for State<T> {
    fn value(&self) -> Option<T> {
        self.core.subject.value()
    }

    fn has_value(&self) -> bool {
        self.core.subject.has_value()
    }
}

impl<T: Value> From<&MutableState<T>> for State<T> {
    fn from(state: &MutableState<T>) -> Self {
        state.read_only()
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for MutableState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableState")
            .field("value", &self.value())
            .finish()
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("value", &self.value()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
