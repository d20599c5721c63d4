#![forbid(unsafe_code)]

//! Widget controls for view models.
//!
//! A control bundles the properties behind one kind of on-screen widget: an
//! input's text and error, a check box's state, a dialog's display state.
//! The view model owns the control and changes it through its properties;
//! the view binds it to a concrete widget through the small widget traits in
//! [`visual`] and [`dialog`]. Bindings hold widgets weakly and follow the
//! view component's lifecycle: they connect when it starts, disconnect when
//! it stops, and are released when its view is destroyed.
//!
//! # Feature Flags
//!
//! - `state-persistence` (default): [`saved`] constructors that restore a
//!   control from a saved-state handle and keep the handle up to date.

pub mod check;
pub mod dialog;
pub mod displayable;
pub mod input;
pub mod rating;
#[cfg(feature = "state-persistence")]
pub mod saved;
pub mod visual;

pub use check::CheckControl;
pub use dialog::{
    DefaultDialogResult, DefaultResultDialogControl, DialogControl, DialogControlResult,
    DialogHandler, Display,
};
pub use displayable::{DisplayAction, DisplayableControl, DisplayableObserver};
pub use input::{Formatter, InputControl, InputOptions, TextWidget};
pub use rating::RatingControl;
pub use visual::{BindOptions, ChangeListener, ValueWidget, ViewWidget, Visibility, VisualControl};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rvm_core::lifecycle::LiveData;
use rvm_core::{
    AutoDisposable, ON_DESTROY_VIEW_STORE_KEY, Subscription, SubscriptionHandle, ViewComponent,
};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run `connect` each time `component` becomes active and release what it
/// returned (then run `disconnect`) each time it stops.
///
/// The binding is held in the component's destroy-view scope.
pub(crate) fn bind_while_active<C>(
    component: &C,
    connect: impl Fn() -> Vec<Subscription> + Send + Sync + 'static,
    disconnect: impl Fn() + Send + Sync + 'static,
) -> SubscriptionHandle
where
    C: ViewComponent,
{
    let sources: Arc<Mutex<Vec<Subscription>>> = Arc::default();
    let on_active = {
        let sources = Arc::clone(&sources);
        move || {
            let connected = connect();
            tracing::trace!(sources = connected.len(), "widget binding connected");
            lock(&sources).extend(connected);
        }
    };
    let on_inactive = move || {
        let released = std::mem::take(&mut *lock(&sources));
        tracing::trace!(sources = released.len(), "widget binding disconnected");
        drop(released);
        disconnect();
    };
    let mediator = LiveData::<()>::with_hooks(false, on_active, on_inactive);
    let observer = mediator.observe(&component.component_lifecycle(), |()| {});
    let binding =
        Subscription::composite(vec![observer, Subscription::new(move || drop(mediator))]);
    let handle = binding.handle();
    component
        .disposables()
        .register(binding, None, Some(&ON_DESTROY_VIEW_STORE_KEY));
    handle
}
