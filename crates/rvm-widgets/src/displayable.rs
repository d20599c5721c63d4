#![forbid(unsafe_code)]

//! Show/hide control for anything the view displays on demand: progress
//! overlays, banners, bottom sheets.

use std::fmt;
use std::time::Duration;

use rvm_core::property::{MutableState, State};
use rvm_core::stream::Value;
use rvm_core::{SubscriptionHandle, ValueProperty, ViewComponent};

/// What the view should do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "state-persistence", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayAction<T> {
    Hide,
    Show(T),
}

impl<T> DisplayAction<T> {
    #[must_use]
    pub fn is_showing(&self) -> bool {
        matches!(self, Self::Show(_))
    }

    #[must_use]
    pub fn showing_value(&self) -> Option<&T> {
        match self {
            Self::Show(data) => Some(data),
            Self::Hide => None,
        }
    }
}

/// Holds the latest [`DisplayAction`]; starts hidden.
pub struct DisplayableControl<T> {
    action: MutableState<DisplayAction<T>>,
}

impl<T: Value> DisplayableControl<T> {
    /// `debounce` delays the action stream, e.g. to avoid flashing a
    /// progress overlay for short operations.
    #[must_use]
    pub fn new(debounce: Option<Duration>) -> Self {
        Self {
            action: MutableState::with_options(Some(DisplayAction::Hide), debounce, None),
        }
    }

    #[cfg(feature = "state-persistence")]
    pub(crate) fn with_action(initial: DisplayAction<T>, debounce: Option<Duration>) -> Self {
        Self {
            action: MutableState::with_options(Some(initial), debounce, None),
        }
    }

    #[must_use]
    pub fn action(&self) -> State<DisplayAction<T>> {
        self.action.read_only()
    }

    pub fn show(&self, data: T) {
        self.action.set(DisplayAction::Show(data));
    }

    pub fn hide(&self) {
        self.action.set(DisplayAction::Hide);
    }

    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.action.value().is_some_and(|action| action.is_showing())
    }

    #[must_use]
    pub fn showing_value(&self) -> Option<T> {
        match self.action.value() {
            Some(DisplayAction::Show(data)) => Some(data),
            _ => None,
        }
    }
}

impl<T: Value> Default for DisplayableControl<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for DisplayableControl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayableControl")
            .field("action", &self.action.value())
            .finish()
    }
}

/// Observation of a [`DisplayableControl`] from a view component.
pub trait DisplayableObserver: ViewComponent {
    /// Call `on_action(is_showing, data)` for every action while started.
    fn observe_displayable<T: Value>(
        &self,
        control: &DisplayableControl<T>,
        on_action: impl Fn(bool, Option<T>) + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        Self: Sized,
    {
        self.observe(&control.action, move |action: DisplayAction<T>| match action {
            DisplayAction::Show(data) => on_action(true, Some(data)),
            DisplayAction::Hide => on_action(false, None),
        })
    }

    /// Split form of [`observe_displayable`](Self::observe_displayable).
    fn observe_show_hide<T: Value>(
        &self,
        control: &DisplayableControl<T>,
        on_show: impl Fn(T) + Send + Sync + 'static,
        on_hide: impl Fn() + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        Self: Sized,
    {
        self.observe(&control.action, move |action: DisplayAction<T>| match action {
            DisplayAction::Show(data) => on_show(data),
            DisplayAction::Hide => on_hide(),
        })
    }
}

impl<C: ViewComponent> DisplayableObserver for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::tests::started_screen;
    use rvm_core::{FragmentComponent, LifecycleEvent};
    use std::sync::{Arc, Mutex};

    #[test]
    fn show_and_hide_update_state() {
        let progress = DisplayableControl::<u8>::default();
        assert!(!progress.is_showing());
        progress.show(40);
        assert!(progress.is_showing());
        assert_eq!(progress.showing_value(), Some(40));
        progress.hide();
        assert_eq!(progress.showing_value(), None);
        assert_eq!(progress.action().value(), Some(DisplayAction::Hide));
    }

    #[test]
    fn observer_receives_flag_and_data() {
        let screen = started_screen();
        let banner = DisplayableControl::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        screen.observe_displayable(&banner, move |showing, data| {
            s.lock().unwrap().push((showing, data));
        });
        banner.show("offline");
        banner.hide();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(false, None), (true, Some("offline")), (false, None)]
        );
    }

    #[test]
    fn split_observer_follows_fragment_view() {
        let fragment = FragmentComponent::new();
        fragment.handle_event(LifecycleEvent::Create);
        fragment.on_view_created();
        fragment.handle_event(LifecycleEvent::Start);

        let sheet = DisplayableControl::new(None);
        let log = Arc::new(Mutex::new(Vec::new()));
        let (shown, hidden) = (Arc::clone(&log), Arc::clone(&log));
        fragment.observe_show_hide(
            &sheet,
            move |n: u32| shown.lock().unwrap().push(format!("show {n}")),
            move || hidden.lock().unwrap().push("hide".to_owned()),
        );
        sheet.show(2);
        fragment.on_destroy_view();
        sheet.show(3);
        assert_eq!(*log.lock().unwrap(), vec!["hide", "show 2"]);
    }

    #[test]
    fn payload_accessor_borrows() {
        let action = DisplayAction::Show(String::from("x"));
        assert_eq!(action.showing_value().map(String::as_str), Some("x"));
        assert!(DisplayAction::<String>::Hide.showing_value().is_none());
    }
}
