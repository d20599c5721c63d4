#![forbid(unsafe_code)]

//! Bridge to a host-provided key/value store that survives process death.
//!
//! The host hands a component a [`SavedStateHandle`]. States built with
//! [`saved_state`] read their initial value from it and write every later
//! value back. Keys are `"<Owner>.<field>"` ([`state_key`]) unless the caller
//! picks one; values are stored as JSON.
//!
//! # Failure Modes
//!
//! - A stored value that no longer deserializes into the requested type is
//!   reported with a warning and treated as absent.
//! - A value that fails to serialize is not written; the previous stored
//!   value stays.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::component::AutoDisposable;
use crate::lock;
use crate::property::{MutableState, ObservableProperty};
use crate::stream::Value;

/// Host key/value store.
pub trait SavedStateHandle: Send + Sync {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&self, key: &str, value: serde_json::Value);

    fn remove(&self, key: &str) -> Option<serde_json::Value>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// In-memory [`SavedStateHandle`], serializable as a whole so a host can
/// stash it across restarts.
#[derive(Default)]
pub struct MemorySavedState {
    entries: Mutex<serde_json::Map<String, serde_json::Value>>,
}

impl MemorySavedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a [`to_json`](Self::to_json) snapshot.
    pub fn from_json(snapshot: &str) -> Result<Self, SavedStateError> {
        let entries: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(snapshot).map_err(|source| SavedStateError::Deserialize {
                key: String::from("<snapshot>"),
                source,
            })?;
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Snapshot every entry as one JSON object.
    pub fn to_json(&self) -> Result<String, SavedStateError> {
        serde_json::to_string(&*lock(&self.entries)).map_err(|source| SavedStateError::Serialize {
            key: String::from("<snapshot>"),
            source,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl SavedStateHandle for MemorySavedState {
    fn get(&self, key: &str) -> Option<serde_json::Value> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: serde_json::Value) {
        lock(&self.entries).insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) -> Option<serde_json::Value> {
        lock(&self.entries).remove(key)
    }
}

impl fmt::Debug for MemorySavedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySavedState")
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure converting between a value and its stored JSON.
#[derive(Debug)]
pub enum SavedStateError {
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    Deserialize {
        key: String,
        source: serde_json::Error,
    },
}

impl SavedStateError {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Serialize { key, .. } | Self::Deserialize { key, .. } => key,
        }
    }
}

impl fmt::Display for SavedStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize { key, source } => write!(f, "cannot save {key}: {source}"),
            Self::Deserialize { key, source } => write!(f, "cannot restore {key}: {source}"),
        }
    }
}

impl std::error::Error for SavedStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize { source, .. } | Self::Deserialize { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Keys and (de)serialization
// ---------------------------------------------------------------------------

/// `"<Owner>.<field>"`, where `Owner` is the unqualified type name without
/// generic arguments.
#[must_use]
pub fn state_key<Owner: ?Sized>(field: &str) -> String {
    let full = std::any::type_name::<Owner>();
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);
    format!("{short}.{field}")
}

/// Read and decode the value stored under `key`.
pub fn restore<T: DeserializeOwned>(
    handle: &dyn SavedStateHandle,
    key: &str,
) -> Result<Option<T>, SavedStateError> {
    handle
        .get(key)
        .map(|raw| {
            serde_json::from_value(raw).map_err(|source| SavedStateError::Deserialize {
                key: key.to_owned(),
                source,
            })
        })
        .transpose()
}

/// Encode and store `value` under `key`.
pub fn persist<T: Serialize>(
    handle: &dyn SavedStateHandle,
    key: &str,
    value: &T,
) -> Result<(), SavedStateError> {
    let raw = serde_json::to_value(value).map_err(|source| SavedStateError::Serialize {
        key: key.to_owned(),
        source,
    })?;
    handle.set(key, raw);
    Ok(())
}

/// [`restore`], logging and discarding a decode failure.
pub fn restore_or_warn<T: DeserializeOwned>(handle: &dyn SavedStateHandle, key: &str) -> Option<T> {
    restore(handle, key).unwrap_or_else(|err| {
        tracing::warn!(%err, "discarding unreadable saved state");
        None
    })
}

/// Keep `handle[key]` in sync with `property` for the life of `component`.
pub fn write_through<T, P, C>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    property: &P,
)
where
    T: Value + Serialize,
    P: ObservableProperty<T> + ?Sized,
    C: AutoDisposable,
{
    let handle = Arc::clone(handle);
    let key = key.to_owned();
    let sub = property.view_stream().subscribe(move |value| {
        if let Err(err) = persist(&*handle, &key, &value) {
            tracing::warn!(%err, "saved state not updated");
        }
    });
    component.auto_dispose(sub);
}

/// A state restored from `handle[key]` (or `initial` when absent) and
/// written back on every change until `component` is cleared.
pub fn saved_state<T, C>(
    component: &C,
    handle: &Arc<dyn SavedStateHandle>,
    key: &str,
    initial: Option<T>,
    debounce: Option<Duration>,
) -> MutableState<T>
where
    T: Value + Serialize + DeserializeOwned,
    C: AutoDisposable,
{
    let restored = restore_or_warn(&**handle, key);
    let state = MutableState::with_options(restored.or(initial), debounce, None);
    write_through(component, handle, key, &state);
    state
}

// ---------------------------------------------------------------------------
// SavedValue
// ---------------------------------------------------------------------------

/// A plain value backed by the handle: read lazily on first access, written
/// through on every set.
pub struct SavedValue<T> {
    handle: Arc<dyn SavedStateHandle>,
    key: String,
    initial: Option<T>,
    current: OnceLock<Mutex<Option<T>>>,
}

impl<T> SavedValue<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    #[must_use]
    pub fn new(
        handle: Arc<dyn SavedStateHandle>,
        key: impl Into<String>,
        initial: Option<T>,
    ) -> Self {
        Self {
            handle,
            key: key.into(),
            initial,
            current: OnceLock::new(),
        }
    }

    fn cell(&self) -> &Mutex<Option<T>> {
        self.current.get_or_init(|| {
            let stored = restore_or_warn(&*self.handle, &self.key);
            Mutex::new(stored.or_else(|| self.initial.clone()))
        })
    }

    #[must_use]
    pub fn get(&self) -> Option<T> {
        lock(self.cell()).clone()
    }

    /// Store `value` locally and in the handle.
    pub fn set(&self, value: T) -> Result<(), SavedStateError> {
        persist(&*self.handle, &self.key, &value)?;
        *lock(self.cell()) = Some(value);
        Ok(())
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> fmt::Debug for SavedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SavedValue").field("key", &self.key).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
