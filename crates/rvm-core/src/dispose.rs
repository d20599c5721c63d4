#![forbid(unsafe_code)]

//! Scope-keyed auto-disposal registry.
//!
//! A [`DisposableStore`] owns subscriptions on behalf of a component. Each
//! entry lives in a slot addressed by an optional scope ([`StoreKey`]) and a
//! tag. Scopes map to lifecycle stages ("stop", "destroy view"); the `None`
//! scope is the component's whole lifetime.
//!
//! # Invariants
//!
//! 1. Registering under an occupied `(scope, tag)` slot disposes the previous
//!    occupant before `register` returns.
//! 2. `dispose(Some(scope))` disposes and removes every entry of that scope
//!    only; `dispose(None)` does so for every scope.
//! 3. Register and dispose are mutually exclusive on the map, so an entry is
//!    either disposed by a concurrent teardown or still held by the store.
//! 4. Disposal callbacks run after the map lock is released; a teardown may
//!    register or dispose re-entrantly.
//! 5. Dropping the store disposes everything it still holds.

use std::borrow::Cow;
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::lock;
use crate::stream::Disposable;

/// Name of a disposal scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(Cow<'static, str>);

impl StoreKey {
    /// # Panics
    ///
    /// Panics if `name` is empty or only whitespace.
    #[track_caller]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        assert!(!name.trim().is_empty(), "StoreKey name can't be blank");
        Self(name)
    }

    /// Compile-time constructor for scope constants.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in a `const`) if `name` is blank.
    pub const fn from_static(name: &'static str) -> Self {
        let bytes = name.as_bytes();
        let mut i = 0;
        let mut blank = true;
        while i < bytes.len() {
            if !bytes[i].is_ascii_whitespace() {
                blank = false;
            }
            i += 1;
        }
        assert!(!blank, "StoreKey name can't be blank");
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

fn generated_tag() -> String {
    format!("auto-{}", NEXT_TAG.fetch_add(1, Ordering::Relaxed))
}

type Scope = AHashMap<String, Box<dyn Disposable>>;

/// Registry of disposables grouped by scope and tag.
#[derive(Default)]
pub struct DisposableStore {
    scopes: Mutex<AHashMap<Option<StoreKey>, Scope>>,
}

impl DisposableStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `disposable` until its scope is disposed.
    ///
    /// Without a `tag` a unique one is generated. Returns the tag used.
    pub fn register(
        &self,
        disposable: impl Disposable + 'static,
        tag: Option<String>,
        scope: Option<&StoreKey>,
    ) -> String {
        let tag = tag.unwrap_or_else(generated_tag);
        let previous = lock(&self.scopes)
            .entry(scope.cloned())
            .or_default()
            .insert(tag.clone(), Box::new(disposable));
        if let Some(previous) = previous {
            tracing::trace!(
                %tag,
                scope = ?scope.map(StoreKey::name),
                "replacing tagged disposable"
            );
            previous.dispose();
        }
        tag
    }

    /// Dispose and remove every entry of `scope`, or of all scopes for
    /// `None`.
    pub fn dispose(&self, scope: Option<&StoreKey>) {
        let taken: Vec<Box<dyn Disposable>> = {
            let mut scopes = lock(&self.scopes);
            match scope {
                None => scopes
                    .drain()
                    .flat_map(|(_, entries)| entries.into_values())
                    .collect(),
                Some(key) => scopes
                    .get_mut(&Some(key.clone()))
                    .map(|entries| entries.drain().map(|(_, d)| d).collect())
                    .unwrap_or_default(),
            }
        };
        tracing::debug!(
            scope = scope.map_or("<all>", StoreKey::name),
            count = taken.len(),
            "disposing scope"
        );
        for disposable in taken {
            disposable.dispose();
        }
    }

    /// Total number of held entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.scopes).values().map(|entries| entries.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries held under `scope`.
    #[must_use]
    pub fn scope_len(&self, scope: Option<&StoreKey>) -> usize {
        lock(&self.scopes)
            .get(&scope.cloned())
            .map_or(0, |entries| entries.len())
    }

    /// Whether `(scope, tag)` is occupied.
    #[must_use]
    pub fn contains(&self, tag: &str, scope: Option<&StoreKey>) -> bool {
        lock(&self.scopes)
            .get(&scope.cloned())
            .is_some_and(|entries| entries.contains_key(tag))
    }
}

impl Drop for DisposableStore {
    fn drop(&mut self) {
        self.dispose(None);
    }
}

impl fmt::Debug for DisposableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableStore")
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
