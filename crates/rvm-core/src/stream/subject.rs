#![forbid(unsafe_code)]

//! Hot, multicast subjects with serialized emission.
//!
//! Both subjects share one emitter ([`Hub`]). Every publish and every new
//! subscriber becomes an operation on a single queue; whichever thread finds
//! the queue idle drains it, so observers see one total order of values even
//! when several threads publish at once, and a callback may publish or
//! subscribe re-entrantly without deadlocking.
//!
//! # Invariants
//!
//! 1. Observers receive values in queue order; values from one producer
//!    thread keep that thread's order.
//! 2. No internal lock is held while an observer callback runs.
//! 3. [`BehaviorSubject::value`] is a lock-free snapshot that reflects every
//!    publish already enqueued, even before observers have been notified.
//! 4. A [`BehaviorSubject`] subscriber first receives the value that was
//!    current at its position in the queue, then everything after it.
//!
//! # Failure Modes
//!
//! - An observer that panics unwinds through the draining producer. The
//!   emitter is re-armed, and operations still queued are delivered by the
//!   next publish.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwapOption;

use super::{Observable, Sink, Subscription, Value};
use crate::lock;

enum Op<T> {
    Next(T),
    Attach(u64, Sink<T>),
}

struct EmitQueue<T> {
    emitting: bool,
    queue: VecDeque<Op<T>>,
    /// Last value handed to observers; replayed to attaching sinks.
    delivered: Option<T>,
}

struct Hub<T> {
    observers: Mutex<Vec<(u64, Sink<T>)>>,
    emitter: Mutex<EmitQueue<T>>,
    latest: ArcSwapOption<T>,
    replay: bool,
    next_id: AtomicU64,
}

/// Re-arms the emitter if an observer panics mid-drain.
struct DrainGuard<'a, T> {
    hub: &'a Hub<T>,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(&self.hub.emitter).emitting = false;
        }
    }
}

impl<T: Value> Hub<T> {
    fn new(initial: Option<T>, replay: bool) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            latest: ArcSwapOption::from(initial.clone().map(Arc::new)),
            emitter: Mutex::new(EmitQueue {
                emitting: false,
                queue: VecDeque::new(),
                delivered: initial,
            }),
            replay,
            next_id: AtomicU64::new(1),
        }
    }

    fn publish(&self, value: T) {
        {
            let mut q = lock(&self.emitter);
            if self.replay {
                self.latest.store(Some(Arc::new(value.clone())));
            }
            q.queue.push_back(Op::Next(value));
            if q.emitting {
                return;
            }
            q.emitting = true;
        }
        self.drain();
    }

    fn attach(self: &Arc<Self>, sink: Sink<T>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let start = {
            let mut q = lock(&self.emitter);
            q.queue.push_back(Op::Attach(id, sink));
            if q.emitting {
                false
            } else {
                q.emitting = true;
                true
            }
        };
        if start {
            self.drain();
        }
        let hub: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.detach(id);
            }
        })
    }

    fn detach(&self, id: u64) {
        let removed: Vec<(u64, Sink<T>)> = {
            let mut observers = lock(&self.observers);
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *observers)
                .into_iter()
                .partition(|(oid, _)| *oid == id);
            *observers = kept;
            gone
        };
        drop(removed);
    }

    fn drain(&self) {
        let _guard = DrainGuard { hub: self };
        loop {
            let op = {
                let mut q = lock(&self.emitter);
                match q.queue.pop_front() {
                    None => {
                        q.emitting = false;
                        return;
                    }
                    Some(Op::Next(value)) => {
                        if self.replay {
                            q.delivered = Some(value.clone());
                        }
                        Op::Next(value)
                    }
                    Some(attach) => attach,
                }
            };
            match op {
                Op::Next(value) => {
                    let targets: Vec<Sink<T>> = {
                        let mut observers = lock(&self.observers);
                        observers.retain(|(_, sink)| sink.is_active());
                        observers.iter().map(|(_, sink)| sink.clone()).collect()
                    };
                    for sink in targets {
                        sink.next(value.clone());
                    }
                }
                Op::Attach(id, sink) => {
                    if !sink.is_active() {
                        continue;
                    }
                    let replay = if self.replay {
                        lock(&self.emitter).delivered.clone()
                    } else {
                        None
                    };
                    lock(&self.observers).push((id, sink.clone()));
                    if let Some(value) = replay {
                        sink.next(value);
                    }
                }
            }
        }
    }

    fn observer_count(&self) -> usize {
        lock(&self.observers)
            .iter()
            .filter(|(_, sink)| sink.is_active())
            .count()
    }
}

fn observable_of<T: Value>(hub: &Arc<Hub<T>>) -> Observable<T> {
    let hub = Arc::clone(hub);
    Observable::create(move |sink| hub.attach(sink))
}

// ---------------------------------------------------------------------------
// PublishSubject
// ---------------------------------------------------------------------------

/// Multicast stream without storage: a value published while nobody is
/// subscribed is lost.
pub struct PublishSubject<T> {
    hub: Arc<Hub<T>>,
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T: Value> PublishSubject<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hub: Arc::new(Hub::new(None, false)),
        }
    }

    /// Publish to every current subscriber.
    pub fn next(&self, value: T) {
        self.hub.publish(value);
    }

    /// Stream of values published after subscription.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        observable_of(&self.hub)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.hub.observer_count()
    }
}

impl<T: Value> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for PublishSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishSubject").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// BehaviorSubject
// ---------------------------------------------------------------------------

/// Multicast stream that remembers its latest value and replays it to each
/// new subscriber.
pub struct BehaviorSubject<T> {
    hub: Arc<Hub<T>>,
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            hub: Arc::clone(&self.hub),
        }
    }
}

impl<T: Value> BehaviorSubject<T> {
    /// Create a subject, optionally seeded with a value.
    #[must_use]
    pub fn new(initial: Option<T>) -> Self {
        Self {
            hub: Arc::new(Hub::new(initial, true)),
        }
    }

    /// Store `value` and publish it.
    pub fn next(&self, value: T) {
        self.hub.publish(value);
    }

    /// Snapshot of the latest published value.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.hub.latest.load_full().map(|v| T::clone(&v))
    }

    /// Whether anything has been published or seeded.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.hub.latest.load().is_some()
    }

    /// Latest value, then every later one.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        observable_of(&self.hub)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.hub.observer_count()
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for BehaviorSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorSubject")
            .field("value", &self.value())
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
    use crate::stream::tests::Recorder;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn publish_without_subscribers_is_lost() {
        let subject = PublishSubject::new();
        subject.next(1);
        let rec = Recorder::new();
        let _sub = subject.observable().subscribe_sink(rec.sink());
        subject.next(2);
        assert_eq!(rec.values(), vec![2]);
    }

    #[test]
    fn behavior_replays_latest_only() {
        let subject = BehaviorSubject::new(None);
        subject.next(1);
        subject.next(2);
        let rec = Recorder::new();
        let _sub = subject.observable().subscribe_sink(rec.sink());
        subject.next(3);
        assert_eq!(rec.values(), vec![2, 3]);
        assert_eq!(subject.value(), Some(3));
    }

    #[test]
    fn behavior_seed_is_replayed() {
        let subject = BehaviorSubject::new(Some("seed"));
        let rec = Recorder::new();
        let _sub = subject.observable().subscribe_sink(rec.sink());
        assert_eq!(rec.values(), vec!["seed"]);
    }

    #[test]
    fn empty_behavior_replays_nothing() {
        let subject = BehaviorSubject::<i32>::new(None);
        assert!(!subject.has_value());
        let rec = Recorder::new();
        let _sub = subject.observable().subscribe_sink(rec.sink());
        assert!(rec.values().is_empty());
    }

    #[test]
    fn dispose_detaches_observer() {
        let subject = BehaviorSubject::new(Some(0));
        let rec = Recorder::new();
        let sub = subject.observable().subscribe_sink(rec.sink());
        assert_eq!(subject.observer_count(), 1);
        sub.dispose();
        assert_eq!(subject.observer_count(), 0);
        subject.next(1);
        assert_eq!(rec.values(), vec![0]);
    }

    #[test]
    fn reentrant_publish_is_queued_not_nested() {
        let subject = BehaviorSubject::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = subject.clone();
        let s = Arc::clone(&seen);
        let _sub = subject.observable().subscribe(move |v: i32| {
            s.lock().unwrap().push(v);
            if v == 1 {
                inner.next(2);
                // The nested publish is visible to readers right away.
                assert_eq!(inner.value(), Some(2));
            }
        });
        subject.next(1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn subscribe_inside_callback_sees_consistent_replay() {
        let subject = BehaviorSubject::new(Some(0));
        let late = Recorder::new();
        let late_sink = late.sink();
        let inner = subject.clone();
        let holder: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let h = Arc::clone(&holder);
        let _sub = subject.observable().subscribe(move |v: i32| {
            if v == 1 {
                let sub = inner.observable().subscribe_sink(late_sink.clone());
                h.lock().unwrap().push(sub);
            }
        });
        subject.next(1);
        subject.next(2);
        assert_eq!(late.values(), vec![1, 2]);
    }

    #[test]
    fn concurrent_publishers_keep_per_thread_order() {
        let subject = BehaviorSubject::new(None);
        let seen: Arc<Mutex<Vec<(u8, u32)>>> = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = subject.observable().subscribe(move |v| s.lock().unwrap().push(v));

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2u8)
            .map(|tid| {
                let subject = subject.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..200u32 {
                        subject.next((tid, i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 400);
        for tid in 0..2u8 {
            let mine: Vec<u32> = seen.iter().filter(|(t, _)| *t == tid).map(|(_, i)| *i).collect();
            assert_eq!(mine, (0..200).collect::<Vec<_>>());
        }
        assert_eq!(subject.value(), seen.last().copied());
    }
}
