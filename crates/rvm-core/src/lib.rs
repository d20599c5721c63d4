#![forbid(unsafe_code)]

//! Lifecycle-aware reactive properties for view models.
//!
//! A presentation component declares its observable surface as properties:
//!
//! - [`State`](property::State): last-value cache, replayed to every new
//!   subscriber.
//! - [`Event`](property::Event): a single pending value, delivered to the
//!   first subscriber that attaches after it was emitted.
//! - [`ConfirmationEvent`](property::ConfirmationEvent): a pending value that
//!   stays visible to every new subscriber until it is confirmed.
//! - [`Action`](property::Action): fire-and-forget intents from the view.
//! - [`StateProjection`](property::StateProjection): read-only state derived
//!   from another source.
//!
//! Subscriptions made on behalf of a component are kept in a
//! [`DisposableStore`](dispose::DisposableStore), grouped by lifecycle scope,
//! and released when that scope ends. The [`component`] module binds those
//! scopes to host lifecycle stages and provides the `observe`/`bind`
//! surface used by views and view models.
//!
//! # Feature Flags
//!
//! - `state-persistence` (default): the [`saved_state`] bridge to a host
//!   key/value handle, using `serde_json`.

pub mod binder;
pub mod component;
pub mod dispose;
pub mod lifecycle;
pub mod progress;
pub mod property;
#[cfg(feature = "state-persistence")]
pub mod saved_state;
pub mod stream;

pub use binder::Invocable;
pub use component::{
    AutoDisposable, FragmentComponent, ON_DESTROY_VIEW_STORE_KEY, ON_STOP_STORE_KEY,
    ReactiveViewModel, ScreenComponent, ViewComponent, ViewModelComponent,
};
pub use dispose::{DisposableStore, StoreKey};
pub use lifecycle::{Lifecycle, LifecycleEvent, LifecycleOwner, LifecycleState, LiveData};
pub use property::{
    Action, ConfirmationEvent, ConfirmationEventEmitter, Event, EventEmitter, LiveProperty,
    MutableState, ObservableProperty, State, StateProjection, ValueProperty,
};
pub use stream::{Disposable, Observable, StreamError, Subscription, SubscriptionHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering the data if another thread panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
