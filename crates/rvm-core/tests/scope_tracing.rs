//! Scope teardown as seen through a tracing layer.

use std::fmt;
use std::sync::{Arc, Mutex};

use rvm_core::{
    FragmentComponent, LifecycleEvent, ON_DESTROY_VIEW_STORE_KEY, ON_STOP_STORE_KEY, Subscription,
    ViewComponent,
};
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// `(scope, count)` of every "disposing scope" event.
#[derive(Clone, Default)]
struct ScopeRecorder {
    disposals: Arc<Mutex<Vec<(String, u64)>>>,
}

#[derive(Default)]
struct DisposalFields {
    message: String,
    scope: String,
    count: u64,
}

impl Visit for DisposalFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "scope" {
            self.scope = value.to_owned();
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "count" {
            self.count = value;
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "scope" => self.scope = format!("{value:?}").trim_matches('"').to_owned(),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for ScopeRecorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = DisposalFields::default();
        event.record(&mut fields);
        if fields.message == "disposing scope" {
            self.disposals.lock().unwrap().push((fields.scope, fields.count));
        }
    }
}

#[test]
fn fragment_teardown_disposes_scopes_in_order() {
    let recorder = ScopeRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());

    // Returned so its registry is dropped outside the recorded section.
    let _fragment = tracing::subscriber::with_default(subscriber, || {
        let fragment = FragmentComponent::new();
        fragment.handle_event(LifecycleEvent::Create);
        fragment.on_view_created();
        fragment.handle_event(LifecycleEvent::Start);
        fragment.dispose_on_stop(Subscription::empty(), "refresh");
        fragment.dispose_on_destroy_view(Subscription::empty(), "list");
        fragment.dispose_on_destroy_view(Subscription::empty(), "header");
        fragment.dispose_on_destroy(Subscription::empty(), "repository");

        fragment.handle_event(LifecycleEvent::Stop);
        fragment.handle_event(LifecycleEvent::Destroy);
        fragment
    });

    let disposals = recorder.disposals.lock().unwrap();
    assert_eq!(
        *disposals,
        vec![
            (ON_STOP_STORE_KEY.name().to_owned(), 1),
            (ON_DESTROY_VIEW_STORE_KEY.name().to_owned(), 2),
            ("<all>".to_owned(), 1),
        ]
    );
}
