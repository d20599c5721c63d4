#![forbid(unsafe_code)]

//! Dialogs driven from the view model.
//!
//! The view model decides when a dialog is shown and with which data; the
//! view only knows how to build one. [`DialogControl::show_for_result`]
//! returns a stream that shows the dialog when subscribed and yields at most
//! one result.
//!
//! # Invariants
//!
//! 1. At most one dialog per binding exists at a time. Showing new data
//!    closes the previous dialog first.
//! 2. A dialog closed by the user (its dismiss callback) resets the control
//!    to [`Display::Absent`].
//! 3. When the view stops, the live dialog is handed to
//!    [`DialogHandler::on_dialog_unbind`] and forgotten; the control keeps
//!    its display state, so the dialog is rebuilt when the view restarts.

use std::fmt;
use std::sync::{Arc, Mutex};

use rvm_core::stream::Value;
use rvm_core::{
    Action, LiveProperty, MutableState, Observable, ObservableProperty, StateProjection,
    Subscription, SubscriptionHandle, ValueProperty, ViewComponent,
};

use crate::{bind_while_active, lock};

/// Display state of a dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Display<T> {
    Displayed(T),
    Absent,
}

impl<T> Display<T> {
    #[must_use]
    pub fn is_displayed(&self) -> bool {
        matches!(self, Self::Displayed(_))
    }
}

/// Result type for plain accept/cancel dialogs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DefaultDialogResult {
    Accept,
    Cancel,
}

/// A dialog control answering with [`DefaultDialogResult`].
pub type DefaultResultDialogControl<T> = DialogControl<T, DefaultDialogResult>;

/// Shows and dismisses dialogs of type `D` for a binding.
pub trait DialogHandler<D>: Send + Sync {
    /// Arrange for `dismiss` to run when the user closes `dialog`.
    fn on_setup_on_dismiss(&self, dialog: &D, dismiss: Box<dyn Fn() + Send + Sync>);

    fn on_show_dialog(&self, dialog: &D);

    /// Close `dialog` because the control no longer displays it.
    fn on_close_dialog(&self, dialog: &D);

    /// `dialog` is being released because the view stopped.
    fn on_dialog_unbind(&self, dialog: &D) {
        self.on_close_dialog(dialog);
    }
}

/// Display state and result channel of one dialog.
pub struct DialogControl<T, R> {
    result: Action<R>,
    displayed_internal: MutableState<Display<T>>,
    displayed: StateProjection<Display<T>>,
    _feed: Subscription,
}

impl<T: Value + PartialEq, R: Value> DialogControl<T, R> {
    #[must_use]
    pub fn new() -> Self {
        let displayed_internal = MutableState::new(Some(Display::Absent));
        let (displayed, feed) =
            StateProjection::from_property(&displayed_internal, false, |display, emit| {
                emit(display)
            });
        Self {
            result: Action::new(None),
            displayed_internal,
            displayed,
            _feed: feed,
        }
    }

    /// Current display state.
    #[must_use]
    pub fn displayed(&self) -> &StateProjection<Display<T>> {
        &self.displayed
    }

    #[must_use]
    pub fn is_showing(&self) -> bool {
        self.displayed_internal
            .value()
            .is_some_and(|display| display.is_displayed())
    }

    /// Show the dialog with `data`, replacing any dialog already shown.
    pub fn show(&self, data: T) {
        self.dismiss();
        self.displayed_internal.set(Display::Displayed(data));
    }

    /// Show the dialog with `data` once subscribed and yield the first
    /// result sent through [`DialogControlResult`].
    ///
    /// The stream completes empty if the dialog is dismissed without a
    /// result. With `dismiss_on_dispose`, ending the subscription also
    /// dismisses the dialog.
    pub fn show_for_result(&self, data: T, dismiss_on_dispose: bool) -> Observable<R> {
        self.dismiss();
        let show = {
            let displayed = self.displayed_internal.clone();
            move || displayed.set(Display::Displayed(data.clone()))
        };
        let finish = {
            let displayed = self.displayed_internal.clone();
            move || {
                if dismiss_on_dispose {
                    dismiss(&displayed);
                }
            }
        };
        let closed = self
            .displayed_internal
            .observable()
            .skip(1)
            .filter(|display| !display.is_displayed());
        self.result
            .observable()
            .do_on_subscribe(show)
            .do_finally(finish)
            .take_until(&closed)
            .take(1)
    }

    pub fn dismiss(&self) {
        dismiss(&self.displayed_internal);
    }

    /// Handle passed to dialog builders.
    #[must_use]
    pub fn result_sender(&self) -> DialogControlResult<T, R> {
        DialogControlResult {
            result: self.result.clone(),
            displayed: self.displayed_internal.clone(),
        }
    }

    /// Build a dialog with `create` whenever the control displays data,
    /// and drive it through `handler`, while `component` is started.
    pub fn bind_to<C, D, H>(
        &self,
        component: &C,
        handler: H,
        create: impl Fn(T, DialogControlResult<T, R>) -> D + Send + Sync + 'static,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        D: Send + 'static,
        H: DialogHandler<D> + 'static,
    {
        let handler = Arc::new(handler);
        let create = Arc::new(create);
        let current: Arc<Mutex<Option<D>>> = Arc::new(Mutex::new(None));
        let source = self.displayed_internal.live_data();
        let sender = self.result_sender();

        let connect = {
            let handler = Arc::clone(&handler);
            let current = Arc::clone(&current);
            move || {
                let handler = Arc::clone(&handler);
                let current = Arc::clone(&current);
                let create = Arc::clone(&create);
                let sender = sender.clone();
                vec![source.observe_forever(move |display| match display {
                    Display::Displayed(data) => {
                        let dialog = create(data, sender.clone());
                        let on_dismiss = sender.clone();
                        handler
                            .on_setup_on_dismiss(&dialog, Box::new(move || on_dismiss.dismiss()));
                        handler.on_show_dialog(&dialog);
                        let replaced = lock(&current).replace(dialog);
                        if let Some(previous) = replaced {
                            handler.on_close_dialog(&previous);
                        }
                    }
                    Display::Absent => {
                        let closing = lock(&current).take();
                        if let Some(dialog) = closing {
                            handler.on_close_dialog(&dialog);
                        }
                    }
                })]
            }
        };
        let disconnect = move || {
            let released = lock(&current).take();
            if let Some(dialog) = released {
                handler.on_dialog_unbind(&dialog);
            }
        };
        bind_while_active(component, connect, disconnect)
    }
}

fn dismiss<T: Value>(displayed: &MutableState<Display<T>>) {
    if displayed.value().is_some_and(|display| display.is_displayed()) {
        displayed.set(Display::Absent);
    }
}

impl<T: Value + PartialEq, R: Value> Default for DialogControl<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value + fmt::Debug, R> fmt::Debug for DialogControl<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogControl")
            .field("displayed", &self.displayed_internal.value())
            .finish()
    }
}

/// Lets a dialog report its outcome.
pub struct DialogControlResult<T, R> {
    result: Action<R>,
    displayed: MutableState<Display<T>>,
}

impl<T, R> Clone for DialogControlResult<T, R> {
    fn clone(&self) -> Self {
        Self {
            result: self.result.clone(),
            displayed: self.displayed.clone(),
        }
    }
}

impl<T: Value, R: Value> DialogControlResult<T, R> {
    /// Deliver `result` and close the dialog.
    pub fn send_result(&self, result: R) {
        self.result.call(result);
        dismiss(&self.displayed);
    }

    /// Deliver `result`, leaving the dialog open.
    pub fn send_result_without_dismiss(&self, result: R) {
        self.result.call(result);
    }

    pub fn dismiss(&self) {
        dismiss(&self.displayed);
    }
}

impl<T, R> fmt::Debug for DialogControlResult<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialogControlResult").finish_non_exhaustive()
    }
}

impl<T: Value> DialogControlResult<T, DefaultDialogResult> {
    pub fn accept(&self) {
        self.send_result(DefaultDialogResult::Accept);
    }

    pub fn cancel(&self) {
        self.send_result(DefaultDialogResult::Cancel);
    }
}
