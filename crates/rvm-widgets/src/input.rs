#![forbid(unsafe_code)]

//! Text input control.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rvm_core::property::{MutableState, ValueHook};
use rvm_core::{LiveProperty, SubscriptionHandle, ValueProperty, ViewComponent};

use crate::visual::{BindOptions, ValueWidget, Visibility, VisualControl};

/// Rewrites entered text before it is stored, e.g. to apply a mask.
pub type Formatter = ValueHook<String>;

/// A text widget that can also show an error message.
pub trait TextWidget: ValueWidget<String> {
    /// Show `error`; an empty string clears it.
    fn show_error(&self, error: &str);
}

/// Construction options for an [`InputControl`].
#[derive(Clone)]
pub struct InputOptions {
    /// Clear the error on every accepted user edit.
    pub hide_error_on_input: bool,
    pub formatter: Option<Formatter>,
    pub enabled: bool,
    pub visibility: Visibility,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            hide_error_on_input: true,
            formatter: None,
            enabled: true,
            visibility: Visibility::Visible,
        }
    }
}

impl fmt::Debug for InputOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputOptions")
            .field("hide_error_on_input", &self.hide_error_on_input)
            .field("formatter", &self.formatter.is_some())
            .field("enabled", &self.enabled)
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// Text plus an error message.
///
/// With `hide_error_on_input`, every accepted user edit clears the error.
pub struct InputControl {
    visual: VisualControl<String>,
    error: MutableState<String>,
}

impl InputControl {
    /// Enabled, visible input that clears its error on input.
    #[must_use]
    pub fn new(initial_text: impl Into<String>) -> Self {
        Self::with_options(initial_text, true, None, true, Visibility::Visible)
    }

    #[must_use]
    pub fn with_options(
        initial_text: impl Into<String>,
        hide_error_on_input: bool,
        formatter: Option<Formatter>,
        enabled: bool,
        visibility: Visibility,
    ) -> Self {
        let error = MutableState::new(None);
        let on_change = {
            let error = error.clone();
            move |_: &String| {
                if hide_error_on_input {
                    error.set(String::new());
                }
            }
        };
        Self {
            visual: VisualControl::with_hooks(
                initial_text.into(),
                enabled,
                visibility,
                formatter,
                on_change,
            ),
            error,
        }
    }

    /// [`with_options`](Self::with_options) taking an [`InputOptions`].
    #[must_use]
    pub fn from_options(initial_text: impl Into<String>, options: InputOptions) -> Self {
        Self::with_options(
            initial_text,
            options.hide_error_on_input,
            options.formatter,
            options.enabled,
            options.visibility,
        )
    }

    /// Shorthand for a formatter closure.
    #[must_use]
    pub fn formatter(f: impl Fn(String) -> String + Send + Sync + 'static) -> Formatter {
        Arc::new(f)
    }

    #[must_use]
    pub fn error(&self) -> &MutableState<String> {
        &self.error
    }

    /// Current error, `None` when unset or cleared.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.value().filter(|e| !e.is_empty())
    }

    /// Bind to `widget`. With `bind_error`, the error state is shown too.
    pub fn bind_to<C, W>(
        &self,
        component: &C,
        widget: &Arc<W>,
        bind_error: bool,
        options: BindOptions,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        W: TextWidget + 'static,
    {
        let error = bind_error.then(|| self.error.live_data());
        self.visual.bind_with(component, widget, options, move |widget| {
            let Some(error) = &error else {
                return Vec::new();
            };
            let widget = widget.clone();
            vec![error.observe_forever(move |message| {
                if let Some(widget) = widget.upgrade() {
                    widget.show_error(&message);
                }
            })]
        })
    }
}

impl AsRef<VisualControl<String>> for InputControl {
    fn as_ref(&self) -> &VisualControl<String> {
        &self.visual
    }
}

impl Deref for InputControl {
    type Target = VisualControl<String>;

    fn deref(&self) -> &Self::Target {
        &self.visual
    }
}

impl fmt::Debug for InputControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputControl")
            .field("visual", &self.visual)
            .field("error", &self.error.value())
            .finish()
    }
}
