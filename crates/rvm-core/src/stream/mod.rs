#![forbid(unsafe_code)]

//! Minimal thread-safe push streams.
//!
//! The property primitives publish through this runtime and the view layer
//! observes through it. It is deliberately small: cold [`Observable`]s built
//! from a subscribe function, a handful of operators, two hot subjects, and a
//! dispatch seam for "deliver on the UI thread".
//!
//! # Architecture
//!
//! An [`Observable<T>`] is a shared subscribe function `Fn(Sink<T>) ->
//! Subscription`. Operators wrap the downstream [`Sink`] and subscribe
//! upstream; every subscription gets its own operator state.
//!
//! A [`Sink`] carries an `active` flag. Terminal signals clear it, and so
//! does disposing the [`Subscription`] returned by
//! [`Observable::subscribe_sink`], so nothing is delivered after either.
//!
//! # Invariants
//!
//! 1. A sink delivers at most one terminal signal, and nothing after it.
//! 2. A sink delivers nothing once its subscription is disposed.
//! 3. Operator state is per subscription; observables are reusable.
//!
//! # Failure Modes
//!
//! - A panicking callback unwinds through the producer that published.
//! - Completing an operator does not tear down its upstream; the upstream is
//!   released when the outer subscription is disposed.

pub mod debounce;
pub mod dispatch;
mod operators;
pub mod subject;
pub mod subscription;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use dispatch::{Dispatcher, ImmediateDispatcher, MainThreadQueue, Task};
pub use subject::{BehaviorSubject, PublishSubject};
pub use subscription::{Disposable, Subscription, SubscriptionHandle};

/// Bound shared by every value that travels through a stream.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Type-erased, cloneable error carried by [`Signal::Error`].
#[derive(Clone)]
pub struct StreamError {
    inner: Arc<dyn Error + Send + Sync>,
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Message {}

impl StreamError {
    /// Wrap any error.
    pub fn new(err: impl Error + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(err),
        }
    }

    /// An error that is only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// The wrapped error.
    #[must_use]
    pub fn get_ref(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.inner
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl fmt::Debug for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StreamError")
            .field(&self.inner.to_string())
            .finish()
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source()
    }
}

// ---------------------------------------------------------------------------
// Signal / Sink
// ---------------------------------------------------------------------------

/// One notification pushed through a stream.
#[derive(Debug, Clone)]
pub enum Signal<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

type Emit<T> = Arc<dyn Fn(Signal<T>) + Send + Sync>;

/// Downstream end of a subscription.
pub struct Sink<T> {
    emit: Emit<T>,
    active: Arc<AtomicBool>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            emit: Arc::clone(&self.emit),
            active: Arc::clone(&self.active),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("active", &self.is_active())
            .finish()
    }
}

impl<T> Sink<T> {
    /// Wrap a signal handler.
    pub fn new(emit: impl Fn(Signal<T>) + Send + Sync + 'static) -> Self {
        Self {
            emit: Arc::new(emit),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Deliver a value unless the sink is finished.
    pub fn next(&self, value: T) {
        if self.active.load(Ordering::Acquire) {
            (self.emit)(Signal::Next(value));
        }
    }

    /// Deliver an error and finish the sink.
    pub fn error(&self, err: StreamError) {
        if self.active.swap(false, Ordering::AcqRel) {
            (self.emit)(Signal::Error(err));
        }
    }

    /// Deliver completion and finish the sink.
    pub fn complete(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            (self.emit)(Signal::Complete);
        }
    }

    /// Deliver any signal.
    pub fn signal(&self, signal: Signal<T>) {
        match signal {
            Signal::Next(value) => self.next(value),
            Signal::Error(err) => self.error(err),
            Signal::Complete => self.complete(),
        }
    }

    /// Whether the sink still accepts signals.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Forward a terminal signal of another stream type; values are ignored.
    pub(crate) fn terminate_with<U>(&self, signal: Signal<U>) {
        match signal {
            Signal::Next(_) => {}
            Signal::Error(err) => self.error(err),
            Signal::Complete => self.complete(),
        }
    }
}

// ---------------------------------------------------------------------------
// Observable
// ---------------------------------------------------------------------------

type SubscribeFn<T> = Arc<dyn Fn(Sink<T>) -> Subscription + Send + Sync>;

/// A cold, reusable stream description.
///
/// Nothing happens until [`subscribe`](Self::subscribe) is called; each call
/// runs the subscribe function again.
pub struct Observable<T> {
    source: SubscribeFn<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Value> Observable<T> {
    /// Build an observable from a subscribe function.
    ///
    /// The returned [`Subscription`] must release whatever the function
    /// attached the sink to.
    pub fn create(subscribe: impl Fn(Sink<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(subscribe),
        }
    }

    /// Emit one value, then complete.
    pub fn just(value: T) -> Self {
        Self::create(move |sink| {
            sink.next(value.clone());
            sink.complete();
            Subscription::empty()
        })
    }

    /// Emit each item in order, then complete.
    pub fn from_iter(items: impl IntoIterator<Item = T>) -> Self {
        let items: Arc<[T]> = items.into_iter().collect();
        Self::create(move |sink| {
            for item in items.iter() {
                if !sink.is_active() {
                    break;
                }
                sink.next(item.clone());
            }
            sink.complete();
            Subscription::empty()
        })
    }

    /// Evaluate `f` on every subscription and emit its result.
    pub fn from_fn(f: impl Fn() -> Result<T, StreamError> + Send + Sync + 'static) -> Self {
        Self::create(move |sink| {
            match f() {
                Ok(value) => {
                    sink.next(value);
                    sink.complete();
                }
                Err(err) => sink.error(err),
            }
            Subscription::empty()
        })
    }

    /// Build a fresh observable on every subscription.
    pub fn defer(f: impl Fn() -> Observable<T> + Send + Sync + 'static) -> Self {
        Self::create(move |sink| f().subscribe_sink(sink))
    }

    /// Complete immediately.
    pub fn empty() -> Self {
        Self::create(|sink| {
            sink.complete();
            Subscription::empty()
        })
    }

    /// Never emit anything.
    pub fn never() -> Self {
        Self::create(|_sink| Subscription::empty())
    }

    /// Fail immediately with `err`.
    pub fn error(err: StreamError) -> Self {
        Self::create(move |sink| {
            sink.error(err.clone());
            Subscription::empty()
        })
    }

    /// Attach a sink. Disposing the result stops delivery to that sink
    /// immediately and releases the upstream.
    pub fn subscribe_sink(&self, sink: Sink<T>) -> Subscription {
        let active = Arc::clone(&sink.active);
        let upstream = (self.source)(sink);
        Subscription::new(move || {
            active.store(false, Ordering::Release);
            upstream.dispose();
        })
    }

    /// Subscribe to values only. Errors are logged and end the subscription.
    pub fn subscribe(&self, on_next: impl Fn(T) + Send + Sync + 'static) -> Subscription {
        self.subscribe_sink(Sink::new(move |signal| match signal {
            Signal::Next(value) => on_next(value),
            Signal::Error(err) => {
                tracing::warn!(error = %err, "unhandled stream error");
            }
            Signal::Complete => {}
        }))
    }

    /// Subscribe to values and errors.
    pub fn subscribe_with(
        &self,
        on_next: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(StreamError) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_sink(Sink::new(move |signal| match signal {
            Signal::Next(value) => on_next(value),
            Signal::Error(err) => on_error(err),
            Signal::Complete => {}
        }))
    }

    /// Wrap each downstream sink into an upstream sink.
    ///
    /// `op` runs once per subscription, so state it creates is private to
    /// that subscription.
    pub(crate) fn lift<U: Value>(
        &self,
        op: impl Fn(Sink<U>) -> Sink<T> + Send + Sync + 'static,
    ) -> Observable<U> {
        let upstream = self.clone();
        Observable::create(move |down| upstream.subscribe_sink(op(down)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects every signal; shared between a test and its subscription.
    pub(crate) struct Recorder<T> {
        pub(crate) values: Arc<Mutex<Vec<T>>>,
        pub(crate) errors: Arc<Mutex<Vec<String>>>,
        pub(crate) completed: Arc<AtomicBool>,
    }

    impl<T: Value> Recorder<T> {
        pub(crate) fn new() -> Self {
            Self {
                values: Arc::new(Mutex::new(Vec::new())),
                errors: Arc::new(Mutex::new(Vec::new())),
                completed: Arc::new(AtomicBool::new(false)),
            }
        }

        pub(crate) fn sink(&self) -> Sink<T> {
            let values = Arc::clone(&self.values);
            let errors = Arc::clone(&self.errors);
            let completed = Arc::clone(&self.completed);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => values.lock().unwrap().push(v),
                Signal::Error(e) => errors.lock().unwrap().push(e.to_string()),
                Signal::Complete => completed.store(true, Ordering::SeqCst),
            })
        }

        pub(crate) fn values(&self) -> Vec<T> {
            self.values.lock().unwrap().clone()
        }

        pub(crate) fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }

        pub(crate) fn is_completed(&self) -> bool {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn just_emits_then_completes() {
        let rec = Recorder::new();
        let _sub = Observable::just(7).subscribe_sink(rec.sink());
        assert_eq!(rec.values(), vec![7]);
        assert!(rec.is_completed());
    }

    #[test]
    fn from_iter_preserves_order() {
        let rec = Recorder::new();
        let _sub = Observable::from_iter(vec![1, 2, 3]).subscribe_sink(rec.sink());
        assert_eq!(rec.values(), vec![1, 2, 3]);
    }

    #[test]
    fn sink_ignores_signals_after_terminal() {
        let rec = Recorder::new();
        let sink = rec.sink();
        sink.next(1);
        sink.error(StreamError::msg("boom"));
        sink.next(2);
        sink.complete();
        assert_eq!(rec.values(), vec![1]);
        assert_eq!(rec.errors(), vec!["boom".to_string()]);
        assert!(!rec.is_completed());
    }

    #[test]
    fn disposed_subscription_stops_delivery() {
        let holder: Arc<Mutex<Option<Sink<i32>>>> = Arc::new(Mutex::new(None));
        let h = Arc::clone(&holder);
        let obs = Observable::create(move |sink| {
            *h.lock().unwrap() = Some(sink);
            Subscription::empty()
        });
        let rec = Recorder::new();
        let sub = obs.subscribe_sink(rec.sink());
        let sink = holder.lock().unwrap().clone().unwrap();
        sink.next(1);
        sub.dispose();
        sink.next(2);
        assert_eq!(rec.values(), vec![1]);
    }

    #[test]
    fn from_fn_reevaluates_per_subscription() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let obs = Observable::from_fn(move || Ok(c.fetch_add(1, Ordering::SeqCst)));
        let a = Recorder::new();
        let b = Recorder::new();
        let _s1 = obs.subscribe_sink(a.sink());
        let _s2 = obs.subscribe_sink(b.sink());
        assert_eq!(a.values(), vec![0]);
        assert_eq!(b.values(), vec![1]);
    }

    #[test]
    fn stream_error_displays_message() {
        let err = StreamError::msg("network down");
        assert_eq!(err.to_string(), "network down");
        assert!(format!("{err:?}").contains("network down"));
    }
}
