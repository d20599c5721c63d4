#![forbid(unsafe_code)]

//! Two-state control for check boxes, switches and toggle buttons.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rvm_core::{SubscriptionHandle, ViewComponent};

use crate::visual::{BindOptions, ValueWidget, Visibility, VisualControl};

pub struct CheckControl {
    visual: VisualControl<bool>,
}

impl CheckControl {
    #[must_use]
    pub fn new(checked: bool) -> Self {
        Self::with_options(checked, true, Visibility::Visible)
    }

    #[must_use]
    pub fn with_options(checked: bool, enabled: bool, visibility: Visibility) -> Self {
        Self {
            visual: VisualControl::new(checked, enabled, visibility),
        }
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.visual.value().unwrap_or(false)
    }

    pub fn bind_to<C, W>(
        &self,
        component: &C,
        widget: &Arc<W>,
        options: BindOptions,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        W: ValueWidget<bool> + 'static,
    {
        self.visual.bind_to(component, widget, options)
    }
}

impl Default for CheckControl {
    fn default() -> Self {
        Self::new(false)
    }
}

impl AsRef<VisualControl<bool>> for CheckControl {
    fn as_ref(&self) -> &VisualControl<bool> {
        &self.visual
    }
}

impl Deref for CheckControl {
    type Target = VisualControl<bool>;

    fn deref(&self) -> &Self::Target {
        &self.visual
    }
}

impl fmt::Debug for CheckControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CheckControl").field(&self.visual).finish()
    }
}
