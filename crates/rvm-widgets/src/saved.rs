#![forbid(unsafe_code)]

//! Controls restored from, and written back to, a saved-state handle.
//!
//! A visual control stored under `key` uses three entries:
//! `"<key>.data"`, `"<key>.enabled"` and `"<key>.visibility"`. An input
//! control adds `"<key>.error"`, and a displayable control uses
//! `"<key>.action"`. Entries are read once when the control is
//! built and rewritten on every change until the owning component is
//! cleared.

use std::sync::Arc;
use std::time::Duration;

use rvm_core::AutoDisposable;
use rvm_core::saved_state::{SavedStateHandle, restore_or_warn, write_through};
use rvm_core::stream::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::displayable::{DisplayAction, DisplayableControl};
use crate::visual::{Visibility, VisualControl};
use crate::{CheckControl, InputControl, InputOptions, RatingControl};

/// Build a visual control from its saved entries, falling back to the given
/// initial values, and keep the entries up to date.
///
/// `build` receives the restored value, enabled flag and visibility.
pub fn visual_control<T, V, C>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    initial: T,
    enabled: bool,
    visibility: Visibility,
    build: impl FnOnce(T, bool, Visibility) -> V,
) -> V
where
    T: Value + PartialEq + Serialize + DeserializeOwned,
    V: AsRef<VisualControl<T>>,
    C: AutoDisposable,
{
    let data_key = format!("{key}.data");
    let enabled_key = format!("{key}.enabled");
    let visibility_key = format!("{key}.visibility");

    let control = build(
        restore_or_warn(&**handle, &data_key).unwrap_or(initial),
        restore_or_warn(&**handle, &enabled_key).unwrap_or(enabled),
        restore_or_warn(&**handle, &visibility_key).unwrap_or(visibility),
    );
    let visual = control.as_ref();
    write_through(component, handle, &data_key, visual.data());
    write_through(component, handle, &enabled_key, visual.enabled());
    write_through(component, handle, &visibility_key, visual.visibility());
    control
}

/// [`InputControl`] whose error message is saved under `"<key>.error"` next
/// to the visual entries. `options` supplies the initial enabled flag and
/// visibility; the formatter applies only to later edits.
pub fn input_control<C: AutoDisposable>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    initial_text: &str,
    options: InputOptions,
) -> InputControl {
    let InputOptions {
        hide_error_on_input,
        formatter,
        enabled,
        visibility,
    } = options;
    let control = visual_control(
        component,
        handle,
        key,
        initial_text.to_owned(),
        enabled,
        visibility,
        move |text, enabled, visibility| {
            InputControl::with_options(text, hide_error_on_input, formatter, enabled, visibility)
        },
    );
    let error_key = format!("{key}.error");
    if let Some(error) = restore_or_warn::<String>(&**handle, &error_key) {
        control.error().set(error);
    }
    write_through(component, handle, &error_key, control.error());
    control
}

pub fn check_control<C: AutoDisposable>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    checked: bool,
) -> CheckControl {
    visual_control(
        component,
        handle,
        key,
        checked,
        true,
        Visibility::Visible,
        CheckControl::with_options,
    )
}

pub fn rating_control<C: AutoDisposable>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    rating: f32,
) -> RatingControl {
    visual_control(
        component,
        handle,
        key,
        rating,
        true,
        Visibility::Visible,
        RatingControl::with_options,
    )
}

/// [`DisplayableControl`] that resumes showing whatever it showed before.
pub fn displayable_control<T, C>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    debounce: Option<Duration>,
) -> DisplayableControl<T>
where
    T: Value + Serialize + DeserializeOwned,
    C: AutoDisposable,
{
    let action_key = format!("{key}.action");
    let restored = restore_or_warn(&**handle, &action_key).unwrap_or(DisplayAction::Hide);
    let control = DisplayableControl::with_action(restored, debounce);
    write_through(component, handle, &action_key, &control.action());
    control
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvm_core::{ReactiveViewModel, ValueProperty};
    use rvm_core::saved_state::MemorySavedState;
    use serde_json::json;

    fn handle() -> Arc<dyn SavedStateHandle> {
        Arc::new(MemorySavedState::new())
    }

    #[test]
    fn visual_entries_are_written_under_suffixed_keys() {
        let store = handle();
        let vm = ReactiveViewModel::new();
        let check = check_control(&vm, &store, "terms", false);
        check.change_data_value().call(true);
        check.visibility().set(Visibility::Invisible);
        assert_eq!(store.get("terms.data"), Some(json!(true)));
        assert_eq!(store.get("terms.enabled"), Some(json!(true)));
        assert_eq!(store.get("terms.visibility"), Some(json!("Invisible")));
    }

    #[test]
    fn restored_entries_win_over_initial_values() {
        let store = handle();
        store.set("stars.data", json!(4.5));
        store.set("stars.enabled", json!(false));
        let vm = ReactiveViewModel::new();
        let rating = rating_control(&vm, &store, "stars", 0.0);
        assert!((rating.rating() - 4.5).abs() < f32::EPSILON);
        assert!(!rating.enabled().value_or(true));
        assert_eq!(rating.visibility().value(), Some(Visibility::Visible));
    }

    #[test]
    fn restored_text_skips_formatter() {
        let store = handle();
        store.set("name.data", json!("  padded  "));
        let vm = ReactiveViewModel::new();
        let trim = InputControl::formatter(|s| s.trim().to_owned());
        let input = visual_control(
            &vm,
            &store,
            "name",
            String::new(),
            true,
            Visibility::Visible,
            |text, enabled, visibility| {
                InputControl::with_options(text, true, Some(trim), enabled, visibility)
            },
        );
        assert_eq!(input.value().as_deref(), Some("  padded  "));
    }

    #[test]
    fn displayable_resumes_shown_payload() {
        let store = handle();
        {
            let vm = ReactiveViewModel::new();
            let sheet = displayable_control::<u32, _>(&vm, &store, "sheet", None);
            sheet.show(12);
        }
        let vm = ReactiveViewModel::new();
        let sheet = displayable_control::<u32, _>(&vm, &store, "sheet", None);
        assert_eq!(sheet.showing_value(), Some(12));
    }
}
