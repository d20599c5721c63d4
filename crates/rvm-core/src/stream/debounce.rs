#![forbid(unsafe_code)]

//! Time-based debounce and the view-stream adapter.
//!
//! Debounce runs a small worker thread per subscription. The worker holds
//! the newest value and emits it once `interval` passes without another one
//! arriving. Disposing the subscription drops the channel sender, and the
//! worker exits on the next wake-up.
//!
//! # Failure Modes
//!
//! - If the worker thread cannot be spawned the stream is passed through
//!   undebounced and a warning is logged.
//! - Completion flushes the pending value first; an error discards it.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use super::dispatch::{self, Dispatcher};
use super::{Observable, Signal, Sink, Value};

impl<T: Value> Observable<T> {
    /// Emit a value only after `interval` has passed without a newer one.
    ///
    /// A zero interval returns the stream unchanged.
    pub fn debounce(&self, interval: Duration) -> Observable<T> {
        if interval.is_zero() {
            return self.clone();
        }
        let upstream = self.clone();
        Observable::create(move |down: Sink<T>| {
            let (tx, rx) = mpsc::channel::<Signal<T>>();
            let worker_down = down.clone();
            let spawned = thread::Builder::new()
                .name("rvm-debounce".into())
                .spawn(move || run_worker(&rx, &worker_down, interval));
            match spawned {
                Ok(_) => upstream.subscribe_sink(Sink::new(move |signal| {
                    // The worker only goes away after every sender is dropped.
                    let _ = tx.send(signal);
                })),
                Err(err) => {
                    tracing::warn!(error = %err, "debounce worker unavailable, passing through");
                    upstream.subscribe_sink(down)
                }
            }
        })
    }

    /// [`debounce`](Self::debounce) when an interval is configured, identity
    /// otherwise.
    pub fn debounce_opt(&self, interval: Option<Duration>) -> Observable<T> {
        match interval {
            Some(interval) => self.debounce(interval),
            None => self.clone(),
        }
    }

    /// Lifecycle-safe stream for the view layer: optionally debounced, then
    /// delivered on `dispatcher` keeping only the latest undelivered value.
    pub fn to_view_stream_on(
        &self,
        debounce: Option<Duration>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Observable<T> {
        self.debounce_opt(debounce).observe_on_latest(dispatcher)
    }

    /// [`to_view_stream_on`](Self::to_view_stream_on) the process-wide main
    /// dispatcher.
    pub fn to_view_stream(&self, debounce: Option<Duration>) -> Observable<T> {
        self.to_view_stream_on(debounce, dispatch::main_thread())
    }
}

fn run_worker<T>(rx: &mpsc::Receiver<Signal<T>>, down: &Sink<T>, interval: Duration) {
    tracing::trace!(?interval, "debounce worker started");
    let mut pending: Option<T> = None;
    loop {
        let received = if pending.is_some() {
            rx.recv_timeout(interval)
        } else {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };
        match received {
            Ok(Signal::Next(value)) => pending = Some(value),
            Ok(Signal::Complete) => {
                if let Some(value) = pending.take() {
                    down.next(value);
                }
                down.complete();
                break;
            }
            Ok(Signal::Error(err)) => {
                down.error(err);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(value) = pending.take() {
                    down.next(value);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::trace!("debounce worker stopped");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
