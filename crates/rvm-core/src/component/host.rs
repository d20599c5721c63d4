#![forbid(unsafe_code)]

//! Component hosts driven by the UI framework.
//!
//! The host forwards its lifecycle callbacks to one of these types, which
//! dispose the matching registry scope and advance the lifecycle that gates
//! observation.
//!
//! # Invariants
//!
//! 1. On stop, the stop scope is disposed before the lifecycle moves to
//!    `Created`.
//! 2. On destroy, every scope is disposed before the lifecycle moves to
//!    `Destroyed`.
//! 3. A fragment's view lifecycle exists only between `on_view_created` and
//!    `on_destroy_view`; observing outside that window registers nothing.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{
    AutoDisposable, ON_DESTROY_VIEW_STORE_KEY, ON_STOP_STORE_KEY, ViewComponent, ViewModelComponent,
};
use crate::dispose::DisposableStore;
use crate::lifecycle::{Lifecycle, LifecycleEvent, LifecycleOwner};
use crate::lock;
use crate::stream::Disposable;

// ---------------------------------------------------------------------------
// ScreenComponent
// ---------------------------------------------------------------------------

/// A full-screen view component whose view lives as long as it does.
#[derive(Debug, Default)]
pub struct ScreenComponent {
    lifecycle: Lifecycle,
    store: DisposableStore,
}

impl ScreenComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward a host lifecycle callback.
    pub fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Stop => self.store.dispose(Some(&ON_STOP_STORE_KEY)),
            LifecycleEvent::Destroy => self.store.dispose(None),
            _ => {}
        }
        self.lifecycle.handle_event(event);
    }
}

impl LifecycleOwner for ScreenComponent {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }
}

impl AutoDisposable for ScreenComponent {
    fn disposables(&self) -> &DisposableStore {
        &self.store
    }
}

impl ViewComponent for ScreenComponent {
    fn component_lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }

    /// Screens keep view-scoped entries under a `dv-` prefixed tag.
    fn dispose_on_destroy_view(&self, disposable: impl Disposable + 'static, tag: &str) {
        self.auto_dispose_tagged(disposable, format!("dv-{tag}"), Some(&ON_DESTROY_VIEW_STORE_KEY));
    }
}

// ---------------------------------------------------------------------------
// FragmentComponent
// ---------------------------------------------------------------------------

/// A view component whose view can be destroyed and recreated while the
/// component itself survives.
#[derive(Default)]
pub struct FragmentComponent {
    lifecycle: Lifecycle,
    view: Mutex<Option<Lifecycle>>,
    store: DisposableStore,
}

impl FragmentComponent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new view lifecycle, in `Created`.
    pub fn on_view_created(&self) {
        let view = Lifecycle::new();
        view.handle_event(LifecycleEvent::Create);
        let previous = lock(&self.view).replace(view);
        if let Some(previous) = previous {
            tracing::warn!("view created twice without on_destroy_view; destroying the old one");
            previous.handle_event(LifecycleEvent::Destroy);
        }
    }

    /// Dispose the view scope and end the view lifecycle.
    pub fn on_destroy_view(&self) {
        self.store.dispose(Some(&ON_DESTROY_VIEW_STORE_KEY));
        let view = lock(&self.view).take();
        if let Some(view) = view {
            view.handle_event(LifecycleEvent::Destroy);
        }
    }

    /// Forward a host lifecycle callback to the component and, while a view
    /// exists, to the view lifecycle.
    pub fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Stop => self.store.dispose(Some(&ON_STOP_STORE_KEY)),
            LifecycleEvent::Destroy => {
                self.on_destroy_view();
                self.store.dispose(None);
            }
            _ => {}
        }
        if let Some(view) = self.view_lifecycle() {
            view.handle_event(event);
        }
        self.lifecycle.handle_event(event);
    }

    /// The current view lifecycle, if a view exists.
    #[must_use]
    pub fn view_lifecycle(&self) -> Option<Lifecycle> {
        lock(&self.view).clone()
    }

    #[must_use]
    pub fn has_view(&self) -> bool {
        lock(&self.view).is_some()
    }
}

impl LifecycleOwner for FragmentComponent {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.clone()
    }
}

impl AutoDisposable for FragmentComponent {
    fn disposables(&self) -> &DisposableStore {
        &self.store
    }
}

impl ViewComponent for FragmentComponent {
    /// The view lifecycle. Without a view, an already destroyed lifecycle,
    /// so any observation attempted is dropped.
    fn component_lifecycle(&self) -> Lifecycle {
        self.view_lifecycle().unwrap_or_else(|| {
            tracing::warn!("fragment has no view; observation ignored");
            Lifecycle::destroyed()
        })
    }
}

impl fmt::Debug for FragmentComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentComponent")
            .field("state", &self.lifecycle.current_state())
            .field("has_view", &self.has_view())
            .field("store", &self.store)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ReactiveViewModel
// ---------------------------------------------------------------------------

/// Registry-owning base for view models.
///
/// Embed it and delegate [`AutoDisposable::disposables`] to it, or use it
/// directly for small components. Everything it holds is disposed on
/// [`clear`](Self::clear) or drop.
#[derive(Debug, Default)]
pub struct ReactiveViewModel {
    store: DisposableStore,
    cleared: AtomicBool,
}

impl ReactiveViewModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispose every binding. The view model stays usable; later bindings
    /// are held until the next clear.
    pub fn clear(&self) {
        self.cleared.store(true, Ordering::Release);
        self.store.dispose(None);
    }

    /// Whether [`clear`](Self::clear) ran at least once.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }
}

impl AutoDisposable for ReactiveViewModel {
    fn disposables(&self) -> &DisposableStore {
        &self.store
    }
}

impl ViewModelComponent for ReactiveViewModel {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
