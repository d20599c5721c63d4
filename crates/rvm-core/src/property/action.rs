#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::ObservableProperty;
use crate::stream::{Observable, PublishSubject, Value};

struct ActionCore<T> {
    subject: PublishSubject<T>,
    observable: Observable<T>,
}

/// Fire-and-forget intent, usually from the view to its component.
///
/// Nothing is stored: a call made while nobody subscribes is lost.
pub struct Action<T> {
    core: Arc<ActionCore<T>>,
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Value> Action<T> {
    #[must_use]
    pub fn new(debounce: Option<Duration>) -> Self {
        let subject = PublishSubject::new();
        let observable = subject.observable().debounce_opt(debounce);
        Self {
            core: Arc::new(ActionCore {
                subject,
                observable,
            }),
        }
    }

    /// Publish `value` to current subscribers.
    pub fn call(&self, value: T) {
        self.core.subject.next(value);
    }

    pub fn consumer(&self) -> impl Fn(T) + Send + Sync + 'static {
        let action = self.clone();
        move |value| action.call(value)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.subject.observer_count()
    }
}

impl Action<()> {
    /// Call a payload-less action.
    pub fn trigger(&self) {
        self.call(());
    }
}

impl<T: Value> ObservableProperty<T> for Action<T> {
    fn observable(&self) -> Observable<T> {
        self.core.observable.clone()
    }
}

impl<T: Value> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn call_without_subscribers_is_lost() {
        let action = Action::new(None);
        action.call(1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = action.observable().subscribe(move |v| s.lock().unwrap().push(v));
        action.call(2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn multicasts_to_every_subscriber() {
        let action = Action::<()>::new(None);
        let seen = Arc::new(Mutex::new(0));
        let (a, b) = (Arc::clone(&seen), Arc::clone(&seen));
        let _s1 = action.observable().subscribe(move |()| *a.lock().unwrap() += 1);
        let _s2 = action.observable().subscribe(move |()| *b.lock().unwrap() += 1);
        action.trigger();
        assert_eq!(*seen.lock().unwrap(), 2);
        assert_eq!(action.subscriber_count(), 2);
    }
}
