#![forbid(unsafe_code)]

//! Reactive view-model core: public facade.
//!
//! Re-exports [`rvm_core`] (properties, lifecycle, disposal, binders) and
//! [`rvm_widgets`] (widget controls). Most code only needs the prelude.

pub use rvm_core;
pub use rvm_widgets;

pub mod prelude {
    pub use rvm_core::property::{
        action, action_none, confirmation_event, confirmation_event_none, debounced_action,
        debounced_action_none, event, event_none, progress_state, state,
    };
    pub use rvm_core::{
        Action, AutoDisposable, ConfirmationEvent, ConfirmationEventEmitter, DisposableStore, Event,
        EventEmitter, FragmentComponent, Invocable, Lifecycle, LifecycleEvent, LifecycleState,
        LiveProperty, MutableState, Observable, ObservableProperty, ReactiveViewModel,
        ScreenComponent, State, StateProjection, StreamError, Subscription, ValueProperty,
        ViewComponent, ViewModelComponent,
    };
    pub use rvm_widgets::{
        BindOptions, CheckControl, DialogControl, DialogHandler, Display, DisplayAction,
        DisplayableControl, DisplayableObserver, InputControl, InputOptions, RatingControl,
        TextWidget, ValueWidget, ViewWidget, Visibility,
    };

    #[cfg(feature = "state-persistence")]
    pub use rvm_core::saved_state::{MemorySavedState, SavedStateHandle};
}
