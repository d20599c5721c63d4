#![forbid(unsafe_code)]

//! Derived read-only state.

use std::fmt;

use super::{LiveProperty, MutableState, ObservableProperty, ValueProperty};
use crate::lifecycle::LiveData;
use crate::stream::{Observable, Signal, Sink, Subscription, Value};

/// State fed by a source instead of by callers.
///
/// Created through [`from_property`](Self::from_property) or
/// [`from_source`](Self::from_source), which return the feeding
/// subscription next to the projection. The owner keeps that subscription
/// alive (normally in its auto-disposal registry); disposing it freezes the
/// projection at its last value.
pub struct StateProjection<T> {
    state: MutableState<T>,
}

impl<T> Clone for StateProjection<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Value> StateProjection<T> {
    pub(crate) fn new(initial: Option<T>) -> Self {
        Self {
            state: MutableState::new(initial),
        }
    }

    /// Publishing side, only for the code that wires the source.
    pub(crate) fn consumer(&self) -> impl Fn(T) + Send + Sync + 'static {
        self.state.consumer()
    }

    /// Project `source` through `map`.
    ///
    /// `map` receives each source value and an `emit` callback; it may emit
    /// zero, one or several projected values. With `distinct`, consecutive
    /// equal projected values are published once.
    pub fn from_property<S, P>(
        source: &P,
        distinct: bool,
        map: impl Fn(S, &dyn Fn(T)) + Send + Sync + 'static,
    ) -> (Self, Subscription)
    where
        S: Value,
        P: ObservableProperty<S> + ?Sized,
        T: PartialEq,
    {
        let mapped = expand(source.observable(), map);
        let mapped = if distinct {
            mapped.distinct_until_changed()
        } else {
            mapped
        };
        Self::from_source(None, mapped)
    }

    /// One-to-one projection of `source`, distinct until changed.
    pub fn map_from<S, P>(
        source: &P,
        map: impl Fn(S) -> T + Send + Sync + 'static,
    ) -> (Self, Subscription)
    where
        S: Value,
        P: ObservableProperty<S> + ?Sized,
        T: PartialEq,
    {
        Self::from_property(source, true, move |value, emit| emit(map(value)))
    }

    /// Projection fed by an arbitrary stream, seeded with `initial`.
    pub fn from_source(initial: Option<T>, source: Observable<T>) -> (Self, Subscription) {
        let projection = Self::new(initial);
        let sub = source.subscribe(projection.consumer());
        (projection, sub)
    }
}

fn expand<S: Value, T: Value>(
    source: Observable<S>,
    map: impl Fn(S, &dyn Fn(T)) + Send + Sync + 'static,
) -> Observable<T> {
    let map = std::sync::Arc::new(map);
    source.lift(move |down: Sink<T>| {
        let map = std::sync::Arc::clone(&map);
        Sink::new(move |signal| match signal {
            Signal::Next(value) => map(value, &|projected: T| down.next(projected)),
            other => down.terminate_with(other),
        })
    })
}

impl<T: Value> ObservableProperty<T> for StateProjection<T> {
    fn observable(&self) -> Observable<T> {
        self.state.observable()
    }
}

impl<T: Value> LiveProperty<T> for StateProjection<T> {
    fn live_data(&self) -> LiveData<T> {
        self.state.live_data()
    }
}

impl<T: Value> ValueProperty<T> for StateProjection<T> {
    fn value(&self) -> Option<T> {
        self.state.value()
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for StateProjection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProjection")
            .field("value", &self.value())
            .finish()
    }
}
