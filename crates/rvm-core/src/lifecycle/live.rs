#![forbid(unsafe_code)]

//! Lifecycle-gated value holder for the view layer.
//!
//! [`LiveData`] keeps the latest value and hands it to observers only while
//! their [`Lifecycle`] is started. An observer that becomes active receives
//! the newest value it has not seen yet; an observer whose lifecycle is
//! destroyed is removed without any action from the caller.
//!
//! In event mode ([`LiveData::event`]) an observer only receives values set
//! after it attached, each at most once, even across repeated
//! inactive/active cycles. This is what screen rotation needs: the new
//! screen re-attaches and must not see an event the old one already handled.
//!
//! # Invariants
//!
//! 1. Callbacks run outside the internal lock, on the thread that caused the
//!    delivery (a `set_value` call or a lifecycle transition).
//! 2. Each observer sees each version at most once.
//! 3. `on_active` runs when the first observer becomes active, before that
//!    observer is handed the held value, and `on_inactive` when the last
//!    one stops being active. A value the hook sets is the one delivered.
//! 4. An absent value is never delivered.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::{Lifecycle, LifecycleState};
use crate::lock;
use crate::stream::Subscription;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;
type Hook = Box<dyn Fn() + Send + Sync>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
    last_version: u64,
    active: bool,
    lifecycle_sub: Option<Subscription>,
}

struct LiveState<T> {
    value: Option<T>,
    version: u64,
    observers: Vec<Entry<T>>,
    active_count: usize,
    next_id: u64,
}

struct LiveInner<T> {
    state: Mutex<LiveState<T>>,
    event_mode: bool,
    on_active: Option<Hook>,
    on_inactive: Option<Hook>,
}

impl<T: Clone> LiveInner<T> {
    fn set_active(&self, id: u64, active: bool) {
        let (became_active, became_inactive) = {
            let mut st = lock(&self.state);
            let Some(entry) = st.observers.iter_mut().find(|e| e.id == id) else {
                return;
            };
            if entry.active == active {
                return;
            }
            entry.active = active;
            if active {
                st.active_count += 1;
                (st.active_count == 1, false)
            } else {
                st.active_count -= 1;
                (false, st.active_count == 0)
            }
        };
        if became_active {
            if let Some(hook) = &self.on_active {
                hook();
            }
        }
        if active {
            self.deliver_unseen(id);
        }
        if became_inactive {
            if let Some(hook) = &self.on_inactive {
                hook();
            }
        }
    }

    /// Hand the held value to `id` if it has not seen this version yet.
    fn deliver_unseen(&self, id: u64) {
        let deliver = {
            let mut st = lock(&self.state);
            let version = st.version;
            let value = st.value.clone();
            let Some(entry) = st.observers.iter_mut().find(|e| e.id == id && e.active) else {
                return;
            };
            if entry.last_version >= version {
                return;
            }
            entry.last_version = version;
            value.map(|value| (Arc::clone(&entry.callback), value))
        };
        if let Some((callback, value)) = deliver {
            callback(value);
        }
    }

    fn remove(&self, id: u64) {
        let (removed, became_inactive) = {
            let mut st = lock(&self.state);
            match st.observers.iter().position(|e| e.id == id) {
                Some(pos) => {
                    let entry = st.observers.remove(pos);
                    let mut became_inactive = false;
                    if entry.active {
                        st.active_count -= 1;
                        became_inactive = st.active_count == 0;
                    }
                    (Some(entry), became_inactive)
                }
                None => (None, false),
            }
        };
        drop(removed);
        if became_inactive {
            if let Some(hook) = &self.on_inactive {
                hook();
            }
        }
    }
}

/// Latest-value holder observed under a lifecycle.
pub struct LiveData<T> {
    inner: Arc<LiveInner<T>>,
}

impl<T> Clone for LiveData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning reference to a [`LiveData`].
pub struct WeakLiveData<T> {
    inner: Weak<LiveInner<T>>,
}

impl<T> Clone for WeakLiveData<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> WeakLiveData<T> {
    #[must_use]
    pub fn upgrade(&self) -> Option<LiveData<T>> {
        self.inner.upgrade().map(|inner| LiveData { inner })
    }
}

impl<T: Clone + Send + Sync + 'static> LiveData<T> {
    /// Plain live data: new observers receive the current value.
    #[must_use]
    pub fn new() -> Self {
        Self::build(false, None, None)
    }

    /// Event-mode live data: new observers only receive later values.
    #[must_use]
    pub fn event() -> Self {
        Self::build(true, None, None)
    }

    /// Live data with activity hooks, used to connect an upstream source
    /// only while someone is watching.
    pub fn with_hooks(
        event_mode: bool,
        on_active: impl Fn() + Send + Sync + 'static,
        on_inactive: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self::build(event_mode, Some(Box::new(on_active)), Some(Box::new(on_inactive)))
    }

    fn build(event_mode: bool, on_active: Option<Hook>, on_inactive: Option<Hook>) -> Self {
        Self {
            inner: Arc::new(LiveInner {
                state: Mutex::new(LiveState {
                    value: None,
                    version: 0,
                    observers: Vec::new(),
                    active_count: 0,
                    next_id: 1,
                }),
                event_mode,
                on_active,
                on_inactive,
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakLiveData<T> {
        WeakLiveData {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Store `value` and deliver it to every active observer.
    pub fn set_value(&self, value: T) {
        let targets: Vec<Callback<T>> = {
            let mut st = lock(&self.inner.state);
            st.version += 1;
            st.value = Some(value.clone());
            let version = st.version;
            st.observers
                .iter_mut()
                .filter(|e| e.active)
                .map(|e| {
                    e.last_version = version;
                    Arc::clone(&e.callback)
                })
                .collect()
        };
        for callback in targets {
            callback(value.clone());
        }
    }

    /// Forget the current value. Nothing is delivered, and observers that
    /// activate later will not see the old value.
    pub fn clear_value(&self) {
        let mut st = lock(&self.inner.state);
        st.version += 1;
        st.value = None;
        let version = st.version;
        for entry in st.observers.iter_mut().filter(|e| e.active) {
            entry.last_version = version;
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<T> {
        lock(&self.inner.state).value.clone()
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        lock(&self.inner.state).value.is_some()
    }

    /// # Panics
    ///
    /// Panics if no value is held.
    #[must_use]
    pub fn value_non_null(&self) -> T {
        match self.value() {
            Some(value) => value,
            None => panic!("LiveData::value_non_null called without a value"),
        }
    }

    pub fn value_or_else(&self, default: impl FnOnce() -> T) -> T {
        self.value().unwrap_or_else(default)
    }

    pub fn value_or(&self, default: T) -> T {
        self.value().unwrap_or(default)
    }

    /// Observe under `lifecycle`.
    ///
    /// Delivery happens only while the lifecycle is started or resumed. The
    /// observer is removed when the lifecycle is destroyed or the returned
    /// subscription is disposed. A destroyed lifecycle registers nothing.
    pub fn observe(
        &self,
        lifecycle: &Lifecycle,
        on_value: impl Fn(T) + Send + Sync + 'static,
    ) -> Subscription {
        if lifecycle.is_destroyed() {
            tracing::debug!("observe on a destroyed lifecycle ignored");
            return Subscription::empty();
        }
        let id = self.insert(Arc::new(on_value), false);

        let weak = Arc::downgrade(&self.inner);
        let lifecycle_sub = lifecycle.add_observer(move |state, _| {
            if let Some(inner) = weak.upgrade() {
                if state == LifecycleState::Destroyed {
                    inner.remove(id);
                } else {
                    inner.set_active(id, state.is_at_least(LifecycleState::Started));
                }
            }
        });
        let orphan = {
            let mut st = lock(&self.inner.state);
            match st.observers.iter_mut().find(|e| e.id == id) {
                Some(entry) => {
                    entry.lifecycle_sub = Some(lifecycle_sub);
                    None
                }
                None => Some(lifecycle_sub),
            }
        };
        drop(orphan);

        if lifecycle.is_active() {
            self.inner.set_active(id, true);
        }
        self.removal(id)
    }

    /// Observe with no lifecycle: always active until disposed.
    pub fn observe_forever(&self, on_value: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        let id = self.insert(Arc::new(on_value), false);
        self.inner.set_active(id, true);
        self.removal(id)
    }

    fn insert(&self, callback: Callback<T>, active: bool) -> u64 {
        let mut st = lock(&self.inner.state);
        let id = st.next_id;
        st.next_id += 1;
        let last_version = if self.inner.event_mode { st.version } else { 0 };
        st.observers.push(Entry {
            id,
            callback,
            last_version,
            active,
            lifecycle_sub: None,
        });
        id
    }

    fn removal(&self, id: u64) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(id);
            }
        })
    }

    /// Whether any observer is currently active.
    #[must_use]
    pub fn has_active_observers(&self) -> bool {
        lock(&self.inner.state).active_count > 0
    }

    /// Number of attached observers, active or not.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        lock(&self.inner.state).observers.len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for LiveData<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + fmt::Debug + 'static> fmt::Debug for LiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveData")
            .field("value", &self.value())
            .field("event_mode", &self.inner.event_mode)
            .field("observers", &self.observer_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn started() -> Lifecycle {
        let lc = Lifecycle::new();
        lc.handle_event(LifecycleEvent::Create);
        lc.handle_event(LifecycleEvent::Start);
        lc
    }

    fn collector<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        (seen, move |v| s.lock().unwrap().push(v))
    }

    #[test]
    fn delivers_only_while_started() {
        let live = LiveData::new();
        let lc = Lifecycle::new();
        lc.handle_event(LifecycleEvent::Create);
        let (seen, f) = collector();
        let _sub = live.observe(&lc, f);
        live.set_value(1);
        assert!(seen.lock().unwrap().is_empty());
        lc.handle_event(LifecycleEvent::Start);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        lc.handle_event(LifecycleEvent::Stop);
        live.set_value(2);
        live.set_value(3);
        lc.handle_event(LifecycleEvent::Start);
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn new_observer_gets_current_value() {
        let live = LiveData::new();
        live.set_value("hello");
        let (seen, f) = collector();
        let _sub = live.observe(&started(), f);
        assert_eq!(*seen.lock().unwrap(), vec!["hello"]);
    }

    #[test]
    fn event_mode_skips_values_set_before_attach() {
        let live = LiveData::event();
        live.set_value(1);
        let (seen, f) = collector();
        let lc = started();
        let _sub = live.observe(&lc, f);
        assert!(seen.lock().unwrap().is_empty());
        live.set_value(2);
        lc.handle_event(LifecycleEvent::Stop);
        lc.handle_event(LifecycleEvent::Start);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn cleared_value_is_not_replayed() {
        let live = LiveData::new();
        live.set_value(5);
        live.clear_value();
        let (seen, f) = collector::<i32>();
        let _sub = live.observe(&started(), f);
        assert!(seen.lock().unwrap().is_empty());
        assert!(!live.has_value());
    }

    #[test]
    fn destroy_removes_observer() {
        let live = LiveData::new();
        let lc = started();
        let (_seen, f) = collector::<i32>();
        let _sub = live.observe(&lc, f);
        assert_eq!(live.observer_count(), 1);
        lc.handle_event(LifecycleEvent::Destroy);
        assert_eq!(live.observer_count(), 0);
        assert!(!live.has_active_observers());
    }

    #[test]
    fn hooks_track_first_and_last_active_observer() {
        let active = Arc::new(AtomicUsize::new(0));
        let inactive = Arc::new(AtomicUsize::new(0));
        let (a, i) = (Arc::clone(&active), Arc::clone(&inactive));
        let live: LiveData<u8> = LiveData::with_hooks(
            false,
            move || {
                a.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                i.fetch_add(1, Ordering::SeqCst);
            },
        );
        let lc = started();
        let s1 = live.observe(&lc, |_| {});
        let s2 = live.observe_forever(|_| {});
        assert_eq!(active.load(Ordering::SeqCst), 1);
        drop(s1);
        assert_eq!(inactive.load(Ordering::SeqCst), 0);
        drop(s2);
        assert_eq!(inactive.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_active_hook_may_set_value() {
        let slot: Arc<Mutex<Option<WeakLiveData<i32>>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&slot);
        let live = LiveData::with_hooks(
            true,
            move || {
                let weak = s.lock().unwrap().clone();
                if let Some(live) = weak.and_then(|w| w.upgrade()) {
                    live.set_value(42);
                }
            },
            || {},
        );
        *slot.lock().unwrap() = Some(live.downgrade());
        let (seen, f) = collector();
        let _sub = live.observe(&started(), f);
        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[test]
    fn value_refreshed_by_on_active_is_delivered_once() {
        let slot: Arc<Mutex<Option<WeakLiveData<&str>>>> = Arc::new(Mutex::new(None));
        let s = Arc::clone(&slot);
        let live = LiveData::with_hooks(
            false,
            move || {
                let weak = s.lock().unwrap().clone();
                if let Some(live) = weak.and_then(|w| w.upgrade()) {
                    live.set_value("fresh");
                }
            },
            || {},
        );
        *slot.lock().unwrap() = Some(live.downgrade());
        live.set_value("stale");

        let first = started();
        let (seen_first, f) = collector();
        let _a = live.observe(&first, f);
        first.handle_event(LifecycleEvent::Destroy);

        let (seen_second, f) = collector();
        let _b = live.observe(&started(), f);
        assert_eq!(*seen_first.lock().unwrap(), vec!["fresh"]);
        assert_eq!(*seen_second.lock().unwrap(), vec!["fresh"]);
    }

    #[test]
    fn observe_on_destroyed_lifecycle_is_ignored() {
        let live = LiveData::new();
        live.set_value(1);
        let _sub = live.observe(&Lifecycle::destroyed(), |_| panic!("inactive"));
        assert_eq!(live.observer_count(), 0);
    }

    #[test]
    #[should_panic(expected = "without a value")]
    fn value_non_null_panics_when_empty() {
        let live = LiveData::<i32>::new();
        let _ = live.value_non_null();
    }
}
