//! Saved state across a simulated process restart.
//!
//! The host snapshots its handle with `to_json`, the process dies, and a new
//! view model is built against a handle restored from that snapshot.

use std::sync::Arc;

use rvm_core::saved_state::{self, MemorySavedState, SavedStateHandle, SavedValue, state_key};
use rvm_core::{ReactiveViewModel, ValueProperty};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Draft {
    title: String,
    tags: Vec<String>,
}

struct EditorViewModel {
    vm: ReactiveViewModel,
    draft: rvm_core::MutableState<Draft>,
    page: rvm_core::MutableState<u32>,
}

impl EditorViewModel {
    fn new(handle: &Arc<dyn SavedStateHandle>) -> Self {
        let vm = ReactiveViewModel::new();
        let draft = saved_state::saved_state(
            &vm,
            handle,
            &state_key::<Self>("draft"),
            Some(Draft {
                title: String::new(),
                tags: Vec::new(),
            }),
            None,
        );
        let page = saved_state::saved_state(&vm, handle, &state_key::<Self>("page"), Some(1), None);
        Self { vm, draft, page }
    }
}

#[test]
fn properties_survive_process_death() {
    let first: Arc<MemorySavedState> = Arc::new(MemorySavedState::new());
    let handle: Arc<dyn SavedStateHandle> = first.clone();
    let snapshot = {
        let editor = EditorViewModel::new(&handle);
        editor.draft.set(Draft {
            title: "Release notes".to_owned(),
            tags: vec!["docs".to_owned()],
        });
        editor.page.set(4);
        first.to_json().unwrap()
    };

    let revived: Arc<dyn SavedStateHandle> =
        Arc::new(MemorySavedState::from_json(&snapshot).unwrap());
    let editor = EditorViewModel::new(&revived);
    assert_eq!(editor.page.value(), Some(4));
    assert_eq!(
        editor.draft.value().map(|d| d.title),
        Some("Release notes".to_owned())
    );
}

#[test]
fn writes_stop_after_clear() {
    let store: Arc<dyn SavedStateHandle> = Arc::new(MemorySavedState::new());
    let editor = EditorViewModel::new(&store);
    editor.page.set(2);
    editor.vm.clear();
    editor.page.set(9);
    let key = state_key::<EditorViewModel>("page");
    assert_eq!(saved_state::restore::<u32>(&*store, &key).unwrap(), Some(2));
}

#[test]
fn saved_value_picks_up_restored_snapshot() {
    let store = MemorySavedState::new();
    saved_state::persist(&store, "session.token", &"abc").unwrap();
    let revived: Arc<dyn SavedStateHandle> =
        Arc::new(MemorySavedState::from_json(&store.to_json().unwrap()).unwrap());
    let token: SavedValue<String> = SavedValue::new(revived, "session.token", None);
    assert_eq!(token.get().as_deref(), Some("abc"));
}
