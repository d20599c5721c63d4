//! A delete-with-confirmation flow written against the prelude only.

use std::sync::{Arc, Mutex};

use rvm::prelude::*;
use rvm::rvm_widgets::{DefaultDialogResult, DialogControlResult};

type Confirm = DialogControlResult<String, DefaultDialogResult>;

struct NotesViewModel {
    store: DisposableStore,
    delete: Action<String>,
    confirm: DialogControl<String, DefaultDialogResult>,
    deleted: EventEmitter<String>,
}

impl AutoDisposable for NotesViewModel {
    fn disposables(&self) -> &DisposableStore {
        &self.store
    }
}

impl ViewModelComponent for NotesViewModel {}

impl NotesViewModel {
    fn new() -> Arc<Self> {
        let vm = Arc::new(Self {
            store: DisposableStore::new(),
            delete: action(None),
            confirm: DialogControl::new(),
            deleted: event(None),
        });
        let confirm_results = {
            let vm = Arc::downgrade(&vm);
            move |title: String| match vm.upgrade() {
                Some(vm) => vm
                    .confirm
                    .show_for_result(format!("Delete {title}?"), true)
                    .filter(|answer| *answer == DefaultDialogResult::Accept)
                    .map(move |_| title.clone()),
                None => Observable::empty(),
            }
        };
        let deleted = vm.deleted.consumer();
        vm.bind_action(&vm.delete, move |titles| {
            titles.switch_map(confirm_results).map(move |title| deleted(title))
        });
        vm
    }
}

/// Dialogs are plain records of their prompt and result sender.
#[derive(Default)]
struct Prompts {
    open: Arc<Mutex<Vec<(String, Confirm)>>>,
}

impl DialogHandler<(String, Confirm)> for Prompts {
    fn on_setup_on_dismiss(
        &self,
        _dialog: &(String, Confirm),
        _dismiss: Box<dyn Fn() + Send + Sync>,
    ) {
    }

    fn on_show_dialog(&self, dialog: &(String, Confirm)) {
        self.open.lock().unwrap().push(dialog.clone());
    }

    fn on_close_dialog(&self, dialog: &(String, Confirm)) {
        self.open.lock().unwrap().retain(|(prompt, _)| *prompt != dialog.0);
    }
}

fn started_screen() -> ScreenComponent {
    let screen = ScreenComponent::new();
    screen.handle_event(LifecycleEvent::Create);
    screen.handle_event(LifecycleEvent::Start);
    screen
}

#[test]
fn accepted_prompt_deletes_note() {
    let vm = NotesViewModel::new();
    let screen = started_screen();
    let prompts = Prompts::default();
    let open = Arc::clone(&prompts.open);
    vm.confirm.bind_to(&screen, prompts, |prompt, sender| (prompt, sender));
    let toasts = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&toasts);
    screen.observe(&vm.deleted.read_only(), move |title: String| t.lock().unwrap().push(title));

    vm.delete.call("groceries".to_owned());
    let (prompt, sender) = open.lock().unwrap()[0].clone();
    assert_eq!(prompt, "Delete groceries?");
    sender.accept();

    assert_eq!(*toasts.lock().unwrap(), vec!["groceries".to_owned()]);
    assert!(open.lock().unwrap().is_empty());
    assert!(!vm.confirm.is_showing());
}

#[test]
fn cancelled_prompt_keeps_note() {
    let vm = NotesViewModel::new();
    let screen = started_screen();
    let prompts = Prompts::default();
    let open = Arc::clone(&prompts.open);
    vm.confirm.bind_to(&screen, prompts, |prompt, sender| (prompt, sender));

    vm.delete.call("drafts".to_owned());
    let (_, sender) = open.lock().unwrap()[0].clone();
    sender.cancel();

    assert!(!vm.deleted.is_pending());
    assert!(open.lock().unwrap().is_empty());
}

#[test]
fn second_request_replaces_open_prompt() {
    let vm = NotesViewModel::new();
    let screen = started_screen();
    let prompts = Prompts::default();
    let open = Arc::clone(&prompts.open);
    vm.confirm.bind_to(&screen, prompts, |prompt, sender| (prompt, sender));

    vm.delete.call("a".to_owned());
    vm.delete.call("b".to_owned());
    let prompts: Vec<String> = open.lock().unwrap().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(prompts, vec!["Delete b?".to_owned()]);
}
