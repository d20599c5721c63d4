//! Benchmarks for property publication and registry churn.
//!
//! Run with: cargo bench -p rvm-core --bench publish_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rvm_core::property::{EventEmitter, MutableState};
use rvm_core::{Action, DisposableStore, ObservableProperty, StoreKey, Subscription};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Publication
// =============================================================================

fn bench_state_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("state/set");
    group.throughput(Throughput::Elements(1));

    for subscribers in [0usize, 1, 8, 64] {
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, &n| {
                let state = MutableState::new(Some(0u64));
                let sink = Arc::new(AtomicU64::new(0));
                let _subs: Vec<Subscription> = (0..n)
                    .map(|_| {
                        let sink = Arc::clone(&sink);
                        state
                            .observable()
                            .subscribe(move |v| {
                                sink.fetch_add(v, Ordering::Relaxed);
                            })
                    })
                    .collect();
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    state.set(black_box(i));
                });
            },
        );
    }
    group.finish();
}

fn bench_set_if_changed_noop(c: &mut Criterion) {
    c.bench_function("state/set_if_changed_same", |b| {
        let state = MutableState::new(Some(7u32));
        let _sub = state.observable().subscribe(|v| {
            black_box(v);
        });
        b.iter(|| state.set_if_changed(black_box(7)));
    });
}

fn bench_action_call(c: &mut Criterion) {
    c.bench_function("action/call", |b| {
        let action = Action::new(None);
        let _sub = action.observable().subscribe(|v: u64| {
            black_box(v);
        });
        b.iter(|| action.call(black_box(1)));
    });
}

fn bench_event_emit(c: &mut Criterion) {
    c.bench_function("event/emit", |b| {
        let event = EventEmitter::new(None);
        let _sub = event.observable().subscribe(|v: u64| {
            black_box(v);
        });
        b.iter(|| event.emit(black_box(1)));
    });
}

// =============================================================================
// Subscription lifecycle
// =============================================================================

fn bench_subscribe_dispose(c: &mut Criterion) {
    c.bench_function("state/subscribe_dispose", |b| {
        let state = MutableState::new(Some(1u8));
        b.iter(|| {
            let sub = state.observable().subscribe(|v| {
                black_box(v);
            });
            sub.dispose();
        });
    });
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    let scope = StoreKey::new("bench.scope");

    group.bench_function("register_auto_tag", |b| {
        let store = DisposableStore::new();
        b.iter(|| black_box(store.register(Subscription::empty(), None, Some(&scope))));
    });

    group.bench_function("replace_tag", |b| {
        let store = DisposableStore::new();
        b.iter(|| store.register(Subscription::empty(), Some(String::from("same")), None));
    });

    for size in [16usize, 256] {
        group.bench_with_input(BenchmarkId::new("fill_and_dispose", size), &size, |b, &n| {
            let store = DisposableStore::new();
            b.iter(|| {
                for _ in 0..n {
                    store.register(Subscription::empty(), None, Some(&scope));
                }
                store.dispose(Some(&scope));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_state_set,
    bench_set_if_changed_noop,
    bench_action_call,
    bench_event_emit,
    bench_subscribe_dispose,
    bench_registry
);
criterion_main!(benches);
