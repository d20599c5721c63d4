//! Controls of a view model surviving process death through a serialized
//! saved-state snapshot.

use std::sync::Arc;

use rvm_core::saved_state::{MemorySavedState, SavedStateHandle};
use rvm_core::{ReactiveViewModel, ValueProperty};
use rvm_widgets::saved::{check_control, displayable_control, input_control, rating_control};
use rvm_widgets::{
    CheckControl, DisplayableControl, InputControl, InputOptions, RatingControl, Visibility,
};

struct ReviewViewModel {
    vm: ReactiveViewModel,
    title: InputControl,
    recommend: CheckControl,
    stars: RatingControl,
    preview: DisplayableControl<String>,
}

impl ReviewViewModel {
    fn new(handle: &Arc<dyn SavedStateHandle>) -> Self {
        let vm = ReactiveViewModel::new();
        let title = input_control(&vm, handle, "review.title", "", InputOptions::default());
        let recommend = check_control(&vm, handle, "review.recommend", false);
        let stars = rating_control(&vm, handle, "review.stars", 0.0);
        let preview = displayable_control(&vm, handle, "review.preview", None);
        Self {
            vm,
            title,
            recommend,
            stars,
            preview,
        }
    }
}

fn relaunch(snapshot: &str) -> Arc<dyn SavedStateHandle> {
    Arc::new(MemorySavedState::from_json(snapshot).expect("snapshot parses"))
}

#[test]
fn edited_form_is_restored_after_process_death() {
    let first_run = Arc::new(MemorySavedState::new());
    let handle: Arc<dyn SavedStateHandle> = first_run.clone();
    let review = ReviewViewModel::new(&handle);
    review.title.change_data_value().call("Great value".to_owned());
    review.recommend.change_data_value().call(true);
    review.stars.change_data_value().call(4.0);
    review.stars.enabled().set(false);
    review.title.visibility().set(Visibility::Gone);
    review.preview.show("draft".to_owned());
    review.title.error().set("too short".to_owned());

    let snapshot = first_run.to_json().expect("snapshot serializes");
    drop(review);

    let restored = ReviewViewModel::new(&relaunch(&snapshot));
    assert_eq!(restored.title.value().as_deref(), Some("Great value"));
    assert_eq!(restored.title.visibility().value(), Some(Visibility::Gone));
    assert_eq!(restored.title.error_message().as_deref(), Some("too short"));
    assert!(restored.recommend.is_checked());
    assert!((restored.stars.rating() - 4.0).abs() < f32::EPSILON);
    assert_eq!(restored.stars.enabled().value(), Some(false));
    assert_eq!(restored.preview.showing_value().as_deref(), Some("draft"));
}

#[test]
fn fresh_launch_uses_initial_values() {
    let handle: Arc<dyn SavedStateHandle> = Arc::new(MemorySavedState::new());
    let review = ReviewViewModel::new(&handle);
    assert_eq!(review.title.value().as_deref(), Some(""));
    assert!(!review.recommend.is_checked());
    assert!(!review.preview.is_showing());
    // Initial values are written right away.
    assert!(handle.contains("review.title.data"));
    assert!(handle.contains("review.preview.action"));
}

#[test]
fn cleared_view_model_leaves_last_snapshot_alone() {
    let first_run = Arc::new(MemorySavedState::new());
    let handle: Arc<dyn SavedStateHandle> = first_run.clone();
    let review = ReviewViewModel::new(&handle);
    review.recommend.change_data_value().call(true);
    review.vm.clear();
    review.recommend.change_data_value().call(false);

    let restored = ReviewViewModel::new(&relaunch(&first_run.to_json().expect("serializes")));
    assert!(restored.recommend.is_checked());
}

#[test]
fn corrupt_entry_falls_back_to_initial_value() {
    let handle: Arc<dyn SavedStateHandle> = Arc::new(MemorySavedState::new());
    handle.set("review.stars.data", serde_json::json!("five"));
    let review = ReviewViewModel::new(&handle);
    assert!(review.stars.rating().abs() < f32::EPSILON);
    assert_eq!(handle.get("review.stars.data"), Some(serde_json::json!(0.0)));
}

#[test]
fn input_options_apply_to_saved_input() {
    let handle: Arc<dyn SavedStateHandle> = Arc::new(MemorySavedState::new());
    let vm = ReactiveViewModel::new();
    let options = InputOptions {
        hide_error_on_input: false,
        formatter: Some(InputControl::formatter(|text| text.trim().to_owned())),
        enabled: false,
        visibility: Visibility::Invisible,
    };
    let coupon = input_control(&vm, &handle, "coupon", "", options);
    assert_eq!(coupon.enabled().value(), Some(false));
    assert_eq!(coupon.visibility().value(), Some(Visibility::Invisible));

    coupon.error().set("expired".to_owned());
    coupon.change_data_value().call("  SAVE10 ".to_owned());
    assert_eq!(coupon.value().as_deref(), Some("SAVE10"));
    assert_eq!(coupon.error_message().as_deref(), Some("expired"));
    assert_eq!(handle.get("coupon.data"), Some(serde_json::json!("SAVE10")));
    assert_eq!(handle.get("coupon.error"), Some(serde_json::json!("expired")));
}
