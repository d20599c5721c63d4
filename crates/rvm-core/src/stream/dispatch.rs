#![forbid(unsafe_code)]

//! Where view-bound deliveries run.
//!
//! The host UI owns a single thread that must receive every view callback.
//! This module models it as a [`Dispatcher`]. Two implementations ship:
//! [`ImmediateDispatcher`] runs tasks inline (the default, and what tests
//! usually want) and [`MainThreadQueue`] buffers tasks until the host calls
//! [`MainThreadQueue::drain`] from its event loop.
//!
//! # Thread Safety
//!
//! The process-wide main dispatcher is held behind an `RwLock`. Reads clone
//! an `Arc` and release the lock before dispatching.

use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::lock;

/// A unit of work handed to a dispatcher.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on some execution context.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, task: Task);
}

/// Runs every task on the calling thread, immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, task: Task) {
        task();
    }
}

/// FIFO task queue drained by the host's UI loop.
///
/// Any thread may dispatch; tasks run on whichever thread calls
/// [`drain`](Self::drain), in dispatch order.
pub struct MainThreadQueue {
    tx: mpsc::Sender<Task>,
    rx: Mutex<mpsc::Receiver<Task>>,
}

impl MainThreadQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Run every queued task, including tasks queued while draining.
    ///
    /// Returns the number of tasks run. Re-entrant calls from inside a task
    /// are allowed.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = lock(&self.rx).try_recv();
            match next {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => return ran,
            }
        }
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for MainThreadQueue {
    fn dispatch(&self, task: Task) {
        // The receiver lives as long as `self`, so sending cannot fail.
        let _ = self.tx.send(task);
    }
}

impl fmt::Debug for MainThreadQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadQueue").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Process-wide main dispatcher
// ---------------------------------------------------------------------------

static MAIN_THREAD: RwLock<Option<Arc<dyn Dispatcher>>> = RwLock::new(None);

/// The dispatcher view streams deliver on. Inline unless the host installed
/// one with [`set_main_thread`].
#[must_use]
pub fn main_thread() -> Arc<dyn Dispatcher> {
    let installed = MAIN_THREAD
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    installed.unwrap_or_else(|| Arc::new(ImmediateDispatcher))
}

/// Install the host's main-thread dispatcher, returning the previous one.
pub fn set_main_thread(dispatcher: Arc<dyn Dispatcher>) -> Option<Arc<dyn Dispatcher>> {
    tracing::debug!("main-thread dispatcher installed");
    MAIN_THREAD
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(dispatcher)
}

/// Go back to inline delivery.
pub fn reset_main_thread() -> Option<Arc<dyn Dispatcher>> {
    MAIN_THREAD
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
