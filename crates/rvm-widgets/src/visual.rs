#![forbid(unsafe_code)]

//! Base of the value-carrying controls.
//!
//! A [`VisualControl`] holds a value, an enabled flag and a [`Visibility`].
//! The view model changes them directly; the widget reports user edits
//! through the control's change action, which updates the value only when
//! it actually differs.
//!
//! # Invariants
//!
//! 1. A value pushed to the widget by the binding is never reported back as
//!    a user edit.
//! 2. A change equal to the current value is dropped before any hook runs.
//! 3. The binding keeps no widget alive; once the widget is dropped every
//!    delivery is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use rvm_core::property::{MutableState, ValueHook};
use rvm_core::{
    Action, LiveProperty, ObservableProperty, StateProjection, Subscription, SubscriptionHandle,
    ValueProperty, ViewComponent,
};
use rvm_core::stream::Value;

use crate::bind_while_active;

/// Whether a widget is shown and whether it takes up space when hidden.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "state-persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    #[default]
    Visible,
    Invisible,
    Gone,
}

impl Visibility {
    #[must_use]
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

// ---------------------------------------------------------------------------
// Widget traits
// ---------------------------------------------------------------------------

/// Listener a widget calls with each user edit.
pub type ChangeListener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// The parts of a widget every control can drive.
pub trait ViewWidget: Send + Sync {
    fn set_enabled(&self, enabled: bool);

    fn set_visibility(&self, visibility: Visibility);
}

/// A widget that displays and edits one value.
pub trait ValueWidget<T>: ViewWidget {
    /// Display `value`. Called by the binding, not by the user.
    fn show_value(&self, value: &T);

    /// Install the edit listener, or remove it with `None`.
    fn set_on_change(&self, listener: Option<ChangeListener<T>>);
}

/// Which optional properties a binding drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindOptions {
    pub enable: bool,
    pub visibility: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            enable: true,
            visibility: true,
        }
    }
}

// ---------------------------------------------------------------------------
// VisualControl
// ---------------------------------------------------------------------------

/// Value, enabled flag and visibility of one widget.
pub struct VisualControl<T> {
    data_internal: MutableState<T>,
    data: StateProjection<T>,
    enabled: MutableState<bool>,
    visibility: MutableState<Visibility>,
    change_data_value: Action<T>,
    _wiring: Subscription,
}

impl<T: Value + PartialEq> VisualControl<T> {
    #[must_use]
    pub fn new(initial: T, enabled: bool, visibility: Visibility) -> Self {
        Self::with_hooks(initial, enabled, visibility, None, |_| {})
    }

    /// `formatter` rewrites every value before it is stored; `on_change`
    /// runs for each accepted user edit, before the value is stored.
    pub(crate) fn with_hooks(
        initial: T,
        enabled: bool,
        visibility: Visibility,
        formatter: Option<ValueHook<T>>,
        on_change: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        let data_internal = MutableState::with_options(Some(initial), None, formatter);
        let (data, feed) =
            StateProjection::from_property(&data_internal, false, |value, emit| emit(value));
        let change_data_value = Action::new(None);
        let accept = {
            let current = data_internal.clone();
            let target = data_internal.clone();
            change_data_value
                .observable()
                .filter(move |value| current.value().as_ref() != Some(value))
                .subscribe(move |value| {
                    on_change(&value);
                    target.set(value);
                })
        };
        Self {
            data_internal,
            data,
            enabled: MutableState::new(Some(enabled)),
            visibility: MutableState::new(Some(visibility)),
            change_data_value,
            _wiring: Subscription::composite(vec![feed, accept]),
        }
    }

    /// Current value, as the view model sees it.
    #[must_use]
    pub fn data(&self) -> &StateProjection<T> {
        &self.data
    }

    #[must_use]
    pub fn enabled(&self) -> &MutableState<bool> {
        &self.enabled
    }

    #[must_use]
    pub fn visibility(&self) -> &MutableState<Visibility> {
        &self.visibility
    }

    /// Where the widget reports user edits.
    #[must_use]
    pub fn change_data_value(&self) -> &Action<T> {
        &self.change_data_value
    }

    /// Replace the value from the view-model side. The widget is updated;
    /// no change hook runs.
    pub fn set_value(&self, value: T) {
        self.data_internal.set(value);
    }

    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.data.value()
    }

    /// Bind to `widget` under `component`'s lifecycle.
    pub fn bind_to<C, W>(
        &self,
        component: &C,
        widget: &Arc<W>,
        options: BindOptions,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        W: ValueWidget<T> + 'static,
    {
        self.bind_with(component, widget, options, |_| Vec::new())
    }

    /// [`bind_to`](Self::bind_to) with extra sources connected alongside the
    /// standard ones.
    pub(crate) fn bind_with<C, W>(
        &self,
        component: &C,
        widget: &Arc<W>,
        options: BindOptions,
        extra: impl Fn(&Weak<W>) -> Vec<Subscription> + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        W: ValueWidget<T> + 'static,
    {
        let widget = Arc::downgrade(widget);
        let enabled = options.enable.then(|| self.enabled.live_data());
        let visibility = options.visibility.then(|| self.visibility.live_data());
        let data = self.data_internal.live_data();
        let change = self.change_data_value.clone();
        let editing = Arc::new(AtomicBool::new(false));

        let connect = {
            let widget = widget.clone();
            move || {
                let mut sources = Vec::with_capacity(4);
                if let Some(enabled) = &enabled {
                    let widget = widget.clone();
                    sources.push(enabled.observe_forever(move |on| {
                        if let Some(widget) = widget.upgrade() {
                            widget.set_enabled(on);
                        }
                    }));
                }
                if let Some(visibility) = &visibility {
                    let widget = widget.clone();
                    sources.push(visibility.observe_forever(move |v| {
                        if let Some(widget) = widget.upgrade() {
                            widget.set_visibility(v);
                        }
                    }));
                }
                {
                    let widget = widget.clone();
                    let editing = Arc::clone(&editing);
                    sources.push(data.observe_forever(move |value| {
                        if let Some(widget) = widget.upgrade() {
                            editing.store(true, Ordering::Release);
                            widget.show_value(&value);
                            editing.store(false, Ordering::Release);
                        }
                    }));
                }
                sources.extend(extra(&widget));
                if let Some(target) = widget.upgrade() {
                    let change = change.clone();
                    let editing = Arc::clone(&editing);
                    target.set_on_change(Some(Arc::new(move |value| {
                        if !editing.load(Ordering::Acquire) {
                            change.call(value);
                        }
                    })));
                }
                sources
            }
        };
        let disconnect = move || {
            if let Some(widget) = widget.upgrade() {
                widget.set_on_change(None);
            }
        };
        bind_while_active(component, connect, disconnect)
    }
}

impl<T> AsRef<VisualControl<T>> for VisualControl<T> {
    fn as_ref(&self) -> &VisualControl<T> {
        self
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for VisualControl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualControl")
            .field("data", &self.data_internal.value())
            .field("enabled", &self.enabled.value())
            .field("visibility", &self.visibility.value())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
