#![forbid(unsafe_code)]

//! Event that stays pending until confirmed.
//!
//! Unlike [`Event`](super::Event), delivering the value does not consume it:
//! every new subscriber receives the pending payload until someone calls
//! [`confirm`](ConfirmationEvent::confirm). Emitting while a payload is
//! already pending replaces it.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::{LiveProperty, MutableState, ObservableProperty, ValueProperty, connected_live_data};
use crate::lifecycle::LiveData;
use crate::stream::{Observable, Value};

#[derive(Debug, Clone, PartialEq)]
enum Slot<T> {
    Pending(T),
    Confirmed,
}

impl<T> Slot<T> {
    fn into_pending(self) -> Option<T> {
        match self {
            Self::Pending(value) => Some(value),
            Self::Confirmed => None,
        }
    }
}

struct ConfirmationCore<T> {
    slot: MutableState<Slot<T>>,
    live: OnceLock<LiveData<T>>,
}

impl<T: Value> ConfirmationCore<T> {
    fn is_confirmed(&self) -> bool {
        matches!(self.slot.value(), Some(Slot::Confirmed) | None)
    }

    fn confirm(&self) {
        if !self.is_confirmed() {
            self.slot.set(Slot::Confirmed);
        }
    }

    fn pending(&self) -> Option<T> {
        self.slot.value().and_then(Slot::into_pending)
    }

    fn observable(&self) -> Observable<T> {
        self.slot.observable().filter_map(Slot::into_pending)
    }

    fn live_data(&self) -> LiveData<T> {
        self.live
            .get_or_init(|| {
                connected_live_data(false, self.slot.view_stream().map(Slot::into_pending))
            })
            .clone()
    }
}

/// Owner handle of a confirmation event: can emit.
pub struct ConfirmationEventEmitter<T> {
    core: Arc<ConfirmationCore<T>>,
}

/// Observe-and-confirm view of a confirmation event.
pub struct ConfirmationEvent<T> {
    core: Arc<ConfirmationCore<T>>,
}

impl<T> Clone for ConfirmationEventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> Clone for ConfirmationEvent<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Value> ConfirmationEventEmitter<T> {
    #[must_use]
    pub fn new(debounce: Option<Duration>) -> Self {
        Self {
            core: Arc::new(ConfirmationCore {
                slot: MutableState::with_options(Some(Slot::Confirmed), debounce, None),
                live: OnceLock::new(),
            }),
        }
    }

    /// Make `value` the pending payload, replacing any unconfirmed one.
    pub fn emit(&self, value: T) {
        self.core.slot.set(Slot::Pending(value));
    }

    pub fn consumer(&self) -> impl Fn(T) + Send + Sync + 'static {
        let event = self.clone();
        move |value| event.emit(value)
    }

    #[must_use]
    pub fn read_only(&self) -> ConfirmationEvent<T> {
        ConfirmationEvent {
            core: Arc::clone(&self.core),
        }
    }

    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.core.is_confirmed()
    }

    /// Acknowledge the pending payload. No-op when already confirmed.
    pub fn confirm(&self) {
        self.core.confirm();
    }

    /// The unconfirmed payload, if any.
    #[must_use]
    pub fn pending(&self) -> Option<T> {
        self.core.pending()
    }
}

impl ConfirmationEventEmitter<()> {
    pub fn trigger(&self) {
        self.emit(());
    }
}

impl<T: Value> ConfirmationEvent<T> {
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.core.is_confirmed()
    }

    /// Acknowledge the pending payload. No-op when already confirmed.
    pub fn confirm(&self) {
        self.core.confirm();
    }

    /// The unconfirmed payload, if any.
    #[must_use]
    pub fn pending(&self) -> Option<T> {
        self.core.pending()
    }
}

impl<T: Value> ObservableProperty<T> for ConfirmationEventEmitter<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable()
    }
}

impl<T: Value> ObservableProperty<T> for ConfirmationEvent<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable()
    }
}

impl<T: Value> LiveProperty<T> for ConfirmationEventEmitter<T> {
    fn live_data(&self) -> LiveData<T> {
        self.core.live_data()
    }
}

impl<T: Value> LiveProperty<T> for ConfirmationEvent<T> {
    fn live_data(&self) -> LiveData<T> {
        self.core.live_data()
    }
}

impl<T: Value> From<&ConfirmationEventEmitter<T>> for ConfirmationEvent<T> {
    fn from(event: &ConfirmationEventEmitter<T>) -> Self {
        event.read_only()
    }
}

impl<T: Value> fmt::Debug for ConfirmationEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationEvent")
            .field("confirmed", &self.is_confirmed())
            .finish()
    }
}

impl<T: Value> fmt::Debug for ConfirmationEventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmationEventEmitter")
            .field("confirmed", &self.is_confirmed())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Lifecycle, LifecycleEvent};
    use crate::stream::Subscription;
    use std::sync::Mutex;

    fn record<T: Value>(obs: &Observable<T>) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let sub = obs.subscribe(move |v| s.lock().unwrap().push(v));
        (seen, sub)
    }

    #[test]
    fn starts_confirmed() {
        let event = ConfirmationEventEmitter::<u8>::new(None);
        assert!(event.is_confirmed());
        let (seen, _sub) = record(&event.observable());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn payload_survives_reattach_until_confirmed() {
        let event = ConfirmationEventEmitter::new(None);
        event.emit("dialog");
        let (a, sa) = record(&event.observable());
        drop(sa);
        let view = event.read_only();
        let (b, _sb) = record(&view.observable());
        assert_eq!(*a.lock().unwrap(), vec!["dialog"]);
        assert_eq!(*b.lock().unwrap(), vec!["dialog"]);

        view.confirm();
        assert!(view.is_confirmed());
        let (c, _sc) = record(&view.observable());
        assert!(c.lock().unwrap().is_empty());
    }

    #[test]
    fn second_emit_overwrites_pending() {
        let event = ConfirmationEventEmitter::new(None);
        event.emit(1);
        event.emit(2);
        assert_eq!(event.pending(), Some(2));
        let (seen, _sub) = record(&event.observable());
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn confirm_when_confirmed_publishes_nothing() {
        let event = ConfirmationEventEmitter::<u8>::new(None);
        let (slots, _sub) = record(&event.core.slot.observable());
        event.confirm();
        event.confirm();
        assert!(event.is_confirmed());
        assert_eq!(*slots.lock().unwrap(), vec![Slot::Confirmed]);
    }

    #[test]
    fn live_data_redelivers_on_reactivation_until_confirmed() {
        let event = ConfirmationEventEmitter::new(None);
        let lc = Lifecycle::new();
        lc.handle_event(LifecycleEvent::Start);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = event
            .read_only()
            .live_data()
            .observe(&lc, move |v| s.lock().unwrap().push(v));
        event.emit("pay");
        lc.handle_event(LifecycleEvent::Stop);
        lc.handle_event(LifecycleEvent::Start);
        assert_eq!(*seen.lock().unwrap(), vec!["pay", "pay"]);

        event.confirm();
        lc.handle_event(LifecycleEvent::Stop);
        lc.handle_event(LifecycleEvent::Start);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn rotated_view_receives_pending_payload_once() {
        let event = ConfirmationEventEmitter::new(None);
        event.emit("dialog");
        let live = event.read_only().live_data();

        let before = Lifecycle::new();
        before.handle_event(LifecycleEvent::Start);
        let first = Arc::new(Mutex::new(Vec::new()));
        let f = Arc::clone(&first);
        let _a = live.observe(&before, move |v| f.lock().unwrap().push(v));
        before.handle_event(LifecycleEvent::Destroy);

        let after = Lifecycle::new();
        after.handle_event(LifecycleEvent::Start);
        let second = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&second);
        let _b = live.observe(&after, move |v| s.lock().unwrap().push(v));

        assert_eq!(*first.lock().unwrap(), vec!["dialog"]);
        assert_eq!(*second.lock().unwrap(), vec!["dialog"]);
        assert!(!event.is_confirmed());
    }
}
