#![forbid(unsafe_code)]

//! Lifecycle-scoped component contracts.
//!
//! A component owns a [`DisposableStore`] and exposes it through
//! [`AutoDisposable`]. View components ([`ViewComponent`]) tie observation
//! and disposal to the host's lifecycle stages; view models
//! ([`ViewModelComponent`]) bind properties to processing chains that live
//! until the view model is cleared.
//!
//! Scope mapping:
//!
//! | scope | disposed when |
//! |-------|---------------|
//! | [`ON_STOP_STORE_KEY`] | every time the component stops |
//! | [`ON_DESTROY_VIEW_STORE_KEY`] | the view is torn down (component may survive) |
//! | none | the component is destroyed or cleared |

mod host;

use std::sync::Arc;

pub use host::{FragmentComponent, ReactiveViewModel, ScreenComponent};

use crate::binder::{Invocable, bind_property};
use crate::dispose::{DisposableStore, StoreKey};
use crate::lifecycle::{Lifecycle, LiveData};
use crate::property::{Action, LiveProperty, ObservableProperty, State, StateProjection};
use crate::stream::{Disposable, Dispatcher, Observable, SubscriptionHandle, Value, dispatch};

/// Scope disposed on every stop.
pub const ON_STOP_STORE_KEY: StoreKey = StoreKey::from_static("view.on_stop");

/// Scope disposed when the view is destroyed.
pub const ON_DESTROY_VIEW_STORE_KEY: StoreKey =
    StoreKey::from_static("view.on_destroy_view");

/// Access to a component's disposal registry.
pub trait AutoDisposable {
    fn disposables(&self) -> &DisposableStore;

    /// Hold `disposable` until the component is destroyed.
    fn auto_dispose(&self, disposable: impl Disposable + 'static) -> String
    where
        Self: Sized,
    {
        self.disposables().register(disposable, None, None)
    }

    /// Hold `disposable` in the `(scope, tag)` slot, disposing any previous
    /// occupant.
    fn auto_dispose_tagged(
        &self,
        disposable: impl Disposable + 'static,
        tag: impl Into<String>,
        scope: Option<&StoreKey>,
    ) -> String
    where
        Self: Sized,
    {
        self.disposables()
            .register(disposable, Some(tag.into()), scope)
    }
}

// ---------------------------------------------------------------------------
// View side
// ---------------------------------------------------------------------------

/// A component with a view: observes properties under its lifecycle.
pub trait ViewComponent: AutoDisposable {
    /// Lifecycle that gates observation.
    fn component_lifecycle(&self) -> Lifecycle;

    fn dispose_on_stop(&self, disposable: impl Disposable + 'static, tag: &str)
    where
        Self: Sized,
    {
        self.auto_dispose_tagged(disposable, tag, Some(&ON_STOP_STORE_KEY));
    }

    fn dispose_on_destroy_view(&self, disposable: impl Disposable + 'static, tag: &str)
    where
        Self: Sized,
    {
        self.auto_dispose_tagged(disposable, tag, Some(&ON_DESTROY_VIEW_STORE_KEY));
    }

    fn dispose_on_destroy(&self, disposable: impl Disposable + 'static, tag: &str)
    where
        Self: Sized,
    {
        self.auto_dispose_tagged(disposable, tag, None);
    }

    /// Call `on_value` with the property's values while the component is
    /// started. The observer lives until the view is destroyed.
    fn observe<T, P>(
        &self,
        property: &P,
        on_value: impl Fn(T) + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        Self: Sized,
        T: Value,
        P: LiveProperty<T> + ?Sized,
    {
        self.observe_live(&property.live_data(), on_value)
    }

    /// [`observe`](Self::observe) for a bare [`LiveData`].
    fn observe_live<T: Value>(
        &self,
        live: &LiveData<T>,
        on_value: impl Fn(T) + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        Self: Sized,
    {
        let sub = live.observe(&self.component_lifecycle(), on_value);
        let handle = sub.handle();
        self.disposables()
            .register(sub, None, Some(&ON_DESTROY_VIEW_STORE_KEY));
        handle
    }
}

// ---------------------------------------------------------------------------
// View-model side
// ---------------------------------------------------------------------------

/// A view model: binds properties to work that survives errors.
pub trait ViewModelComponent: AutoDisposable {
    /// Hook applied to every bound chain before it is retried. Identity by
    /// default; override to log or report errors.
    fn apply_error_handler<T: Value>(&self, stream: Observable<T>) -> Observable<T>
    where
        Self: Sized,
    {
        stream
    }

    /// Where bound chains are subscribed.
    fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        dispatch::main_thread()
    }

    /// Process every call of `action` through `chain` until the component
    /// is cleared.
    fn bind_action<T, U>(
        &self,
        action: &Action<T>,
        chain: impl FnOnce(Observable<T>) -> Observable<U>,
    )
    where
        Self: Sized,
        T: Value,
        U: Value,
    {
        bind_property(self, action.observable(), chain);
    }

    /// Process the current value and every update of `state` through
    /// `chain` until the component is cleared.
    fn bind_state<T, U>(
        &self,
        state: impl Into<State<T>>,
        chain: impl FnOnce(Observable<T>) -> Observable<U>,
    )
    where
        Self: Sized,
        T: Value,
        U: Value,
    {
        bind_property(self, state.into().observable(), chain);
    }

    /// One-to-one projection of `source`, fed until the component is
    /// cleared.
    fn state_projection<S, T, P>(
        &self,
        source: &P,
        map: impl Fn(S) -> T + Send + Sync + 'static,
    ) -> StateProjection<T>
    where
        Self: Sized,
        S: Value,
        T: Value + PartialEq,
        P: ObservableProperty<S> + ?Sized,
    {
        let (projection, feed) = StateProjection::map_from(source, map);
        self.auto_dispose(feed);
        projection
    }

    /// Projection whose `map` may emit any number of values per source
    /// value.
    fn state_projection_with<S, T, P>(
        &self,
        source: &P,
        distinct: bool,
        map: impl Fn(S, &dyn Fn(T)) + Send + Sync + 'static,
    ) -> StateProjection<T>
    where
        Self: Sized,
        S: Value,
        T: Value + PartialEq,
        P: ObservableProperty<S> + ?Sized,
    {
        let (projection, feed) = StateProjection::from_property(source, distinct, map);
        self.auto_dispose(feed);
        projection
    }

    /// Projection fed by an arbitrary stream. Errors go through
    /// [`apply_error_handler`](Self::apply_error_handler) and the stream is
    /// resubscribed.
    fn state_projection_from_source<T: Value>(
        &self,
        initial: Option<T>,
        source: impl FnOnce() -> Observable<T>,
    ) -> StateProjection<T>
    where
        Self: Sized,
    {
        let stream = self.apply_error_handler(source()).retry();
        let (projection, feed) = StateProjection::from_source(initial, stream);
        self.auto_dispose(feed);
        projection
    }

    /// An [`Invocable`] running `work` per invocation.
    fn invocable<T: Value>(
        &self,
        work: impl Fn(T) -> Observable<()> + Send + Sync + 'static,
    ) -> Invocable<T>
    where
        Self: Sized,
    {
        Invocable::bind(self, work)
    }
}
