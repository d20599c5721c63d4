#![forbid(unsafe_code)]

//! Rating bar control.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use rvm_core::{SubscriptionHandle, ViewComponent};

use crate::visual::{BindOptions, ValueWidget, Visibility, VisualControl};

/// A rating in the widget's own units (stars, usually fractional).
pub struct RatingControl {
    visual: VisualControl<f32>,
}

impl RatingControl {
    #[must_use]
    pub fn new(rating: f32) -> Self {
        Self::with_options(rating, true, Visibility::Visible)
    }

    #[must_use]
    pub fn with_options(rating: f32, enabled: bool, visibility: Visibility) -> Self {
        Self {
            visual: VisualControl::new(rating, enabled, visibility),
        }
    }

    #[must_use]
    pub fn rating(&self) -> f32 {
        self.visual.value().unwrap_or_default()
    }

    pub fn bind_to<C, W>(
        &self,
        component: &C,
        widget: &Arc<W>,
        options: BindOptions,
    ) -> SubscriptionHandle
    where
        C: ViewComponent,
        W: ValueWidget<f32> + 'static,
    {
        self.visual.bind_to(component, widget, options)
    }
}

impl Default for RatingControl {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AsRef<VisualControl<f32>> for RatingControl {
    fn as_ref(&self) -> &VisualControl<f32> {
        &self.visual
    }
}

impl Deref for RatingControl {
    type Target = VisualControl<f32>;

    fn deref(&self) -> &Self::Target {
        &self.visual
    }
}

impl fmt::Debug for RatingControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RatingControl").field(&self.visual).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::tests::{FakeWidget, started_screen};
    use rvm_core::ObservableProperty;
    use std::sync::Mutex;

    #[test]
    fn same_rating_is_not_republished() {
        let rating = RatingControl::new(2.5);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = rating.data().observable().subscribe(move |v| s.lock().unwrap().push(v));
        rating.change_data_value().call(2.5);
        rating.change_data_value().call(4.0);
        assert_eq!(*seen.lock().unwrap(), vec![2.5, 4.0]);
    }

    #[test]
    fn widget_rating_flows_both_ways() {
        let screen = started_screen();
        let rating = RatingControl::default();
        let widget = FakeWidget::new();
        rating.bind_to(&screen, &widget, BindOptions::default());
        widget.user_types(3.0);
        assert!((rating.rating() - 3.0).abs() < f32::EPSILON);
        rating.set_value(1.5);
        assert_eq!(widget.shown(), vec![0.0, 3.0, 1.5]);
    }
}
