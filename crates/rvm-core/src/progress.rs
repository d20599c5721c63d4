#![forbid(unsafe_code)]

//! Progress reporting for streams of work.
//!
//! [`bind_progress`](Observable::bind_progress) holds a flag up for the
//! whole life of a subscription. [`bind_progress_any`](Observable::bind_progress_any)
//! drops it at the first sign of life instead: the first value, completion,
//! error or disposal, whichever comes first.
//!
//! [`buffer_while_idle`](Observable::buffer_while_idle) goes the other way:
//! it holds values back while an idle flag is up and releases them when the
//! flag drops.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::lock;
use crate::property::MutableState;
use crate::stream::{Observable, Signal, Sink, Subscription, Value};

impl<T: Value> Observable<T> {
    /// Report `true` on subscribe and `false` when the subscription
    /// terminates or is disposed.
    pub fn bind_progress_with(
        &self,
        report: impl Fn(bool) + Send + Sync + 'static,
    ) -> Observable<T> {
        let report = Arc::new(report);
        let on_end = Arc::clone(&report);
        self.do_finally(move || on_end(false))
            .do_on_subscribe(move || report(true))
    }

    /// [`bind_progress_with`](Self::bind_progress_with) publishing into a
    /// state.
    pub fn bind_progress(&self, progress: &MutableState<bool>) -> Observable<T> {
        self.bind_progress_with(progress.consumer())
    }

    /// Report `true` on subscribe and `false` once, on the first value,
    /// terminal signal or disposal.
    pub fn bind_progress_any_with(
        &self,
        report: impl Fn(bool) + Send + Sync + 'static,
    ) -> Observable<T> {
        let upstream = self.clone();
        let report = Arc::new(report);
        Observable::create(move |down: Sink<T>| {
            let ended = Arc::new(AtomicBool::new(false));
            report(true);
            let end = {
                let report = Arc::clone(&report);
                Arc::new(move || {
                    if !ended.swap(true, Ordering::AcqRel) {
                        report(false);
                    }
                })
            };
            let on_signal = Arc::clone(&end);
            let sub = upstream.subscribe_sink(Sink::new(move |signal| {
                on_signal();
                down.signal(signal);
            }));
            Subscription::new(move || {
                sub.dispose();
                end();
            })
        })
    }

    pub fn bind_progress_any(&self, progress: &MutableState<bool>) -> Observable<T> {
        self.bind_progress_any_with(progress.consumer())
    }

    /// Pass values through while `is_idle` is `false`; while it is `true`,
    /// hold them and emit them in order once it turns `false` again.
    ///
    /// With `buffer_size`, only the newest `buffer_size` held values are
    /// kept. Values arriving before `is_idle` has emitted anything are
    /// dropped. Errors from either stream end the result; completion of
    /// `is_idle` does not, and completion of `self` discards held values.
    pub fn buffer_while_idle(
        &self,
        is_idle: &Observable<bool>,
        buffer_size: Option<usize>,
    ) -> Observable<T> {
        let upstream = self.clone();
        let is_idle = is_idle.clone();
        Observable::create(move |down: Sink<T>| {
            let held = Arc::new(Mutex::new(IdleBuffer::new(buffer_size)));
            let idle_sub = {
                let held = Arc::clone(&held);
                let down = down.clone();
                is_idle.subscribe_sink(Sink::new(move |signal| match signal {
                    Signal::Next(idle) => {
                        let released = lock(&held).set_idle(idle);
                        for value in released {
                            down.next(value);
                        }
                    }
                    Signal::Error(err) => down.error(err),
                    Signal::Complete => {}
                }))
            };
            let values_sub = {
                let held = Arc::clone(&held);
                let down = down.clone();
                upstream.subscribe_sink(Sink::new(move |signal| match signal {
                    Signal::Next(value) => {
                        let passed = lock(&held).accept(value);
                        if let Some(value) = passed {
                            down.next(value);
                        }
                    }
                    other => down.signal(other),
                }))
            };
            Subscription::composite(vec![values_sub, idle_sub])
        })
    }
}

struct IdleBuffer<T> {
    idle: Option<bool>,
    held: VecDeque<T>,
    limit: Option<usize>,
}

impl<T> IdleBuffer<T> {
    fn new(limit: Option<usize>) -> Self {
        Self {
            idle: None,
            held: VecDeque::new(),
            limit,
        }
    }

    /// Record the new flag; returns what an idle period held.
    fn set_idle(&mut self, idle: bool) -> Vec<T> {
        let was_idle = self.idle.replace(idle) == Some(true);
        if was_idle && !idle {
            self.held.drain(..).collect()
        } else {
            Vec::new()
        }
    }

    /// The value back if it may pass now.
    fn accept(&mut self, value: T) -> Option<T> {
        match self.idle {
            Some(false) => Some(value),
            Some(true) => {
                self.held.push_back(value);
                if let Some(limit) = self.limit {
                    while self.held.len() > limit {
                        self.held.pop_front();
                    }
                }
                None
            }
            None => None,
        }
    }
}
