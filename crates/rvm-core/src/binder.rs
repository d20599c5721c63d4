#![forbid(unsafe_code)]

//! Error-tolerant binding of a property to a processing chain.
//!
//! [`bind_property`] connects a property stream to a caller-supplied chain
//! and keeps it alive for the life of the owning component. Errors raised in
//! the chain go through the component's error handler and the chain is
//! resubscribed, so one failed attempt never stops later values from being
//! processed.
//!
//! # Invariants
//!
//! 1. The source is connected once, through a latest-value replay, for the
//!    whole binding. Resubscriptions after an error attach to that replay,
//!    not to the property itself.
//! 2. The replayed value seen right after an error is skipped, so the value
//!    that failed is not reprocessed. A first subscription never skips.
//! 3. The chain is subscribed from a task on the component's dispatcher.
//!
//! # Failure Modes
//!
//! - If the chain errors before the source ever produced a value, the phase
//!   stays at "awaiting first" and nothing is skipped on retry.
//! - A chain that errors on every value re-enters the retry loop once per
//!   source value; the skip keeps it from spinning on the cached one.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::component::ViewModelComponent;
use crate::property::{Action, MutableState, ObservableProperty, ValueProperty};
use crate::stream::{Observable, Value};

// Skip phases. A value passing the replay moves AwaitingFirst to HasValue;
// an error moves HasValue to AfterError; the first replayed value after an
// error is skipped and moves AfterError back to HasValue.
const AWAITING_FIRST: u8 = 0;
const AFTER_ERROR: u8 = 1;
const HAS_VALUE: u8 = 2;

fn advance(phase: &AtomicU8, from: u8, to: u8) -> bool {
    phase
        .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

/// Bind `source` through `chain` for the lifetime of `component`.
pub(crate) fn bind_property<C, T, U>(
    component: &C,
    source: Observable<T>,
    chain: impl FnOnce(Observable<T>) -> Observable<U>,
) where
    C: ViewModelComponent,
    T: Value,
    U: Value,
{
    let (replayed, connection) = source.replay_latest();
    component.auto_dispose(connection);

    let phase = Arc::new(AtomicU8::new(AWAITING_FIRST));
    let (on_value, on_skip, on_error) = (Arc::clone(&phase), Arc::clone(&phase), phase);
    let gated = replayed
        .do_on_next(move |_| {
            advance(&on_value, AWAITING_FIRST, HAS_VALUE);
        })
        .skip_while(move |_| advance(&on_skip, AFTER_ERROR, HAS_VALUE));
    let chained = chain(gated).do_on_error(move |_| {
        advance(&on_error, HAS_VALUE, AFTER_ERROR);
    });

    let binding = component
        .apply_error_handler(chained)
        .retry()
        .subscribe_on(component.dispatcher())
        .subscribe(|_| {});
    component.auto_dispose(binding);
}

// ---------------------------------------------------------------------------
// Invocable
// ---------------------------------------------------------------------------

/// An action bound to a unit of work, with an "executing" flag.
///
/// Each [`invoke`](Self::invoke) starts the work for its parameters; a new
/// invocation cancels the one still running.
pub struct Invocable<T> {
    action: Action<T>,
    executing: MutableState<bool>,
}

impl<T> Clone for Invocable<T> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            executing: self.executing.clone(),
        }
    }
}

impl<T: Value> Invocable<T> {
    pub(crate) fn bind<C>(
        component: &C,
        work: impl Fn(T) -> Observable<()> + Send + Sync + 'static,
    ) -> Self
    where
        C: ViewModelComponent,
    {
        let action = Action::new(None);
        let executing = MutableState::new(Some(false));
        let progress = executing.clone();
        bind_property(component, action.observable(), move |params| {
            params.switch_map(move |p| work(p).bind_progress(&progress))
        });
        Self { action, executing }
    }

    /// Whether a unit of work is running.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing.value().unwrap_or(false)
    }

    /// Stream of the executing flag, starting with the current one.
    #[must_use]
    pub fn is_executing_observable(&self) -> Observable<bool> {
        self.executing.observable()
    }

    pub fn invoke(&self, params: T) {
        self.action.call(params);
    }
}

impl<T: Value> fmt::Debug for Invocable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocable")
            .field("executing", &self.is_executing())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
