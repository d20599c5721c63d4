#![forbid(unsafe_code)]

//! Stream operators.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::dispatch::Dispatcher;
use super::subject::BehaviorSubject;
use super::{Observable, Signal, Sink, StreamError, Subscription, Value};
use crate::lock;

impl<T: Value> Observable<T> {
    // -----------------------------------------------------------------------
    // Transforming
    // -----------------------------------------------------------------------

    /// Transform every value.
    pub fn map<U: Value>(&self, f: impl Fn(T) -> U + Send + Sync + 'static) -> Observable<U> {
        let f = Arc::new(f);
        self.lift(move |down: Sink<U>| {
            let f = Arc::clone(&f);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => down.next(f(v)),
                other => down.terminate_with(other),
            })
        })
    }

    /// Keep values matching `pred`.
    pub fn filter(&self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let pred = Arc::new(pred);
        self.lift(move |down: Sink<T>| {
            let pred = Arc::clone(&pred);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    if pred(&v) {
                        down.next(v);
                    }
                }
                other => down.signal(other),
            })
        })
    }

    /// Transform and drop in one step.
    pub fn filter_map<U: Value>(
        &self,
        f: impl Fn(T) -> Option<U> + Send + Sync + 'static,
    ) -> Observable<U> {
        let f = Arc::new(f);
        self.lift(move |down: Sink<U>| {
            let f = Arc::clone(&f);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    if let Some(u) = f(v) {
                        down.next(u);
                    }
                }
                other => down.terminate_with(other),
            })
        })
    }

    /// Drop values equal to the previous delivered one.
    pub fn distinct_until_changed(&self) -> Observable<T>
    where
        T: PartialEq,
    {
        self.lift(|down: Sink<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    let changed = {
                        let mut last = lock(&last);
                        if last.as_ref() == Some(&v) {
                            false
                        } else {
                            *last = Some(v.clone());
                            true
                        }
                    };
                    if changed {
                        down.next(v);
                    }
                }
                other => down.signal(other),
            })
        })
    }

    /// Drop the first `count` values.
    pub fn skip(&self, count: usize) -> Observable<T> {
        self.lift(move |down: Sink<T>| {
            let seen = AtomicUsize::new(0);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    if seen.fetch_add(1, Ordering::AcqRel) >= count {
                        down.next(v);
                    }
                }
                other => down.signal(other),
            })
        })
    }

    /// Drop values while `pred` holds; pass everything after the first miss.
    pub fn skip_while(&self, pred: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let pred = Arc::new(pred);
        self.lift(move |down: Sink<T>| {
            let pred = Arc::clone(&pred);
            let skipping = AtomicBool::new(true);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    if skipping.load(Ordering::Acquire) {
                        if pred(&v) {
                            return;
                        }
                        skipping.store(false, Ordering::Release);
                    }
                    down.next(v);
                }
                other => down.signal(other),
            })
        })
    }

    /// Emit the first `count` values, then complete.
    pub fn take(&self, count: usize) -> Observable<T> {
        self.lift(move |down: Sink<T>| {
            let taken = AtomicUsize::new(0);
            if count == 0 {
                down.complete();
            }
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    let n = taken.fetch_add(1, Ordering::AcqRel) + 1;
                    if n <= count {
                        down.next(v);
                    }
                    if n == count {
                        down.complete();
                    }
                }
                other => down.signal(other),
            })
        })
    }

    /// Mirror this stream until `other` emits a value, then complete.
    pub fn take_until<U: Value>(&self, other: &Observable<U>) -> Observable<T> {
        let upstream = self.clone();
        let other = other.clone();
        Observable::create(move |down: Sink<T>| {
            let stopper = down.clone();
            let stop = other.subscribe_sink(Sink::new(move |signal| match signal {
                Signal::Next(_) => stopper.complete(),
                Signal::Error(err) => stopper.error(err),
                Signal::Complete => {}
            }));
            let main = upstream.subscribe_sink(down);
            Subscription::composite(vec![main, stop])
        })
    }

    // -----------------------------------------------------------------------
    // Side effects
    // -----------------------------------------------------------------------

    /// Run `f` for every value before passing it on.
    pub fn do_on_next(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Observable<T> {
        let f = Arc::new(f);
        self.lift(move |down: Sink<T>| {
            let f = Arc::clone(&f);
            Sink::new(move |signal| {
                if let Signal::Next(v) = &signal {
                    f(v);
                }
                down.signal(signal);
            })
        })
    }

    /// Run `f` for an error before passing it on.
    pub fn do_on_error(&self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Observable<T> {
        let f = Arc::new(f);
        self.lift(move |down: Sink<T>| {
            let f = Arc::clone(&f);
            Sink::new(move |signal| {
                if let Signal::Error(err) = &signal {
                    f(err);
                }
                down.signal(signal);
            })
        })
    }

    /// Run `f` each time the stream is subscribed, before subscribing upstream.
    pub fn do_on_subscribe(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        let upstream = self.clone();
        Observable::create(move |down| {
            f();
            upstream.subscribe_sink(down)
        })
    }

    /// Run `f` once when the subscription terminates or is disposed,
    /// whichever comes first.
    pub fn do_finally(&self, f: impl Fn() + Send + Sync + 'static) -> Observable<T> {
        let upstream = self.clone();
        let f = Arc::new(f);
        Observable::create(move |down: Sink<T>| {
            let fired = Arc::new(AtomicBool::new(false));
            let finish = {
                let f = Arc::clone(&f);
                let fired = Arc::clone(&fired);
                Arc::new(move || {
                    if !fired.swap(true, Ordering::AcqRel) {
                        f();
                    }
                })
            };
            let on_terminal = Arc::clone(&finish);
            let sub = upstream.subscribe_sink(Sink::new(move |signal| match signal {
                Signal::Next(v) => down.next(v),
                other => {
                    down.signal(other);
                    on_terminal();
                }
            }));
            Subscription::new(move || {
                sub.dispose();
                finish();
            })
        })
    }

    // -----------------------------------------------------------------------
    // Flattening / recovery
    // -----------------------------------------------------------------------

    /// Map each value to an inner stream and mirror only the newest one.
    ///
    /// A new upstream value disposes the previous inner subscription. Inner
    /// completion does not complete the result; inner errors do.
    pub fn switch_map<U: Value>(
        &self,
        f: impl Fn(T) -> Observable<U> + Send + Sync + 'static,
    ) -> Observable<U> {
        let upstream = self.clone();
        let f = Arc::new(f);
        Observable::create(move |down: Sink<U>| {
            let state = Arc::new(SwitchState {
                inner: Mutex::new(None),
                generation: AtomicU64::new(0),
            });
            let f = Arc::clone(&f);
            let outer_state = Arc::clone(&state);
            let outer_down = down.clone();
            let outer = upstream.subscribe_sink(Sink::new(move |signal| match signal {
                Signal::Next(v) => outer_state.switch_to(f(v), &outer_down),
                other => outer_down.terminate_with(other),
            }));
            Subscription::new(move || {
                outer.dispose();
                let inner = lock(&state.inner).take();
                if let Some(inner) = inner {
                    inner.dispose();
                }
            })
        })
    }

    /// Resubscribe upstream after every error, indefinitely.
    ///
    /// Errors are never forwarded. Synchronous errors during resubscription
    /// are handled iteratively, so a source that always fails synchronously
    /// spins instead of overflowing the stack.
    pub fn retry(&self) -> Observable<T> {
        let upstream = self.clone();
        Observable::create(move |down: Sink<T>| {
            let ctx = Arc::new(RetryCtx {
                upstream: upstream.clone(),
                down,
                current: Mutex::new(None),
                wip: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            });
            ctx.schedule();
            Subscription::new(move || ctx.cancel())
        })
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Subscribe upstream from a task on `dispatcher`.
    pub fn subscribe_on(&self, dispatcher: Arc<dyn Dispatcher>) -> Observable<T> {
        let upstream = self.clone();
        Observable::create(move |down: Sink<T>| {
            let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
            let cancelled = Arc::new(AtomicBool::new(false));
            let task_slot = Arc::clone(&slot);
            let task_cancelled = Arc::clone(&cancelled);
            let upstream = upstream.clone();
            dispatcher.dispatch(Box::new(move || {
                if task_cancelled.load(Ordering::Acquire) {
                    return;
                }
                let sub = upstream.subscribe_sink(down);
                *lock(&task_slot) = Some(sub);
                if task_cancelled.load(Ordering::Acquire) {
                    let sub = lock(&task_slot).take();
                    drop(sub);
                }
            }));
            Subscription::new(move || {
                cancelled.store(true, Ordering::Release);
                let sub = lock(&slot).take();
                drop(sub);
            })
        })
    }

    /// Deliver on `dispatcher`, keeping only the newest undelivered value.
    ///
    /// Values that arrive while a delivery task is queued replace each other;
    /// the task delivers whatever is newest when it runs.
    pub fn observe_on_latest(&self, dispatcher: Arc<dyn Dispatcher>) -> Observable<T> {
        self.lift(move |down: Sink<T>| {
            let shared = Arc::new(LatestSlot {
                latest: Mutex::new(None),
                scheduled: AtomicBool::new(false),
            });
            let dispatcher = Arc::clone(&dispatcher);
            Sink::new(move |signal| match signal {
                Signal::Next(v) => {
                    *lock(&shared.latest) = Some(v);
                    if !shared.scheduled.swap(true, Ordering::AcqRel) {
                        let shared = Arc::clone(&shared);
                        let down = down.clone();
                        dispatcher.dispatch(Box::new(move || {
                            shared.scheduled.store(false, Ordering::Release);
                            let value = lock(&shared.latest).take();
                            if let Some(value) = value {
                                down.next(value);
                            }
                        }));
                    }
                }
                terminal => {
                    let shared = Arc::clone(&shared);
                    let down = down.clone();
                    dispatcher.dispatch(Box::new(move || {
                        let value = lock(&shared.latest).take();
                        if let Some(value) = value {
                            down.next(value);
                        }
                        down.signal(terminal);
                    }));
                }
            })
        })
    }

    // -----------------------------------------------------------------------
    // Multicasting
    // -----------------------------------------------------------------------

    /// Connect to this stream now and share it, replaying the latest value to
    /// every subscriber.
    ///
    /// Returns the shared stream and the connection. Disposing the connection
    /// stops feeding the shared stream; terminal signals from upstream end
    /// the connection but are not replayed.
    pub fn replay_latest(&self) -> (Observable<T>, Subscription) {
        let subject = BehaviorSubject::new(None);
        let feed = subject.clone();
        let connection = self.subscribe(move |v| feed.next(v));
        (subject.observable(), connection)
    }
}

struct SwitchState {
    inner: Mutex<Option<Subscription>>,
    generation: AtomicU64,
}

impl SwitchState {
    fn switch_to<U: Value>(&self, next: Observable<U>, down: &Sink<U>) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = lock(&self.inner).take();
        drop(previous);

        let current = Arc::new(AtomicBool::new(true));
        let inner_down = down.clone();
        let inner_current = Arc::clone(&current);
        let sub = next.subscribe_sink(Sink::new(move |signal| {
            if !inner_current.load(Ordering::Acquire) {
                return;
            }
            match signal {
                Signal::Next(v) => inner_down.next(v),
                Signal::Error(err) => inner_down.error(err),
                Signal::Complete => {}
            }
        }));
        let stale = {
            let mut slot = lock(&self.inner);
            if self.generation.load(Ordering::Acquire) == generation {
                *slot = Some(sub);
                None
            } else {
                Some(sub)
            }
        };
        if let Some(stale) = stale {
            current.store(false, Ordering::Release);
            drop(stale);
        }
    }
}

struct RetryCtx<T> {
    upstream: Observable<T>,
    down: Sink<T>,
    current: Mutex<Option<Subscription>>,
    wip: AtomicUsize,
    disposed: AtomicBool,
}

impl<T: Value> RetryCtx<T> {
    fn schedule(self: &Arc<Self>) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            if self.disposed.load(Ordering::Acquire) {
                return;
            }
            let weak: Weak<Self> = Arc::downgrade(self);
            let down = self.down.clone();
            let sub = self.upstream.subscribe_sink(Sink::new(move |signal| match signal {
                Signal::Next(v) => down.next(v),
                Signal::Complete => down.complete(),
                Signal::Error(err) => {
                    tracing::warn!(error = %err, "stream failed, resubscribing");
                    if let Some(ctx) = weak.upgrade() {
                        ctx.schedule();
                    }
                }
            }));
            let previous = lock(&self.current).replace(sub);
            drop(previous);
            if self.disposed.load(Ordering::Acquire) {
                let current = lock(&self.current).take();
                drop(current);
                return;
            }
            if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
                return;
            }
        }
    }

    fn cancel(&self) {
        self.disposed.store(true, Ordering::Release);
        let current = lock(&self.current).take();
        drop(current);
    }
}

struct LatestSlot<T> {
    latest: Mutex<Option<T>>,
    scheduled: AtomicBool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
