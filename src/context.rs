//! Cooperative cancellation for engine calls.
//!
//! A [`Context`] is created by the caller and passed by reference into every transformation,
//! grouping and aggregation call. The engine never creates one itself; it only checks it:
//!
//! - instantaneously, via [`Context::is_done`] / [`Context::check`]
//! - while blocked, by selecting on [`Context::done`], a channel that disconnects once the
//!   context is done
//!
//! Clones share the same signal, so a clone handed to another thread can cancel the original.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{EngineError, EngineResult};

const ACTIVE: u8 = 0;
const CANCELED: u8 = 1;
const DEADLINE_EXCEEDED: u8 = 2;

/// Cancellation token threaded through every engine call.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    state: AtomicU8,
    cancelable: bool,
    deadline: Option<Instant>,
    // Dropped on the first transition out of ACTIVE, which disconnects `done_rx`.
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
}

impl Inner {
    fn new(cancelable: bool, deadline: Option<Instant>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            state: AtomicU8::new(ACTIVE),
            cancelable,
            deadline,
            done_tx: Mutex::new(Some(tx)),
            done_rx: rx,
        }
    }

    fn finish(&self, state: u8) {
        if self
            .state
            .compare_exchange(ACTIVE, state, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let sender = match self.done_tx.lock() {
                Ok(mut guard) => guard.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };
            drop(sender);
        }
    }

    fn current(&self) -> u8 {
        let state = self.state.load(Ordering::SeqCst);
        if state == ACTIVE {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.finish(DEADLINE_EXCEEDED);
                    return self.state.load(Ordering::SeqCst);
                }
            }
        }
        state
    }
}

impl Context {
    /// A context that is never done. [`Context::cancel`] is a no-op on it.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner::new(false, None)),
        }
    }

    /// A context that is done once [`Context::cancel`] is called on it or any clone.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new(true, None)),
        }
    }

    /// A cancelable context that additionally becomes done after `timeout`.
    ///
    /// A timer thread fires the deadline; it exits early when the context is canceled or
    /// every clone has been dropped.
    pub fn with_timeout(timeout: Duration) -> EngineResult<Self> {
        let deadline = Instant::now() + timeout;
        let ctx = Self {
            inner: Arc::new(Inner::new(true, Some(deadline))),
        };

        let done = ctx.inner.done_rx.clone();
        let weak: Weak<Inner> = Arc::downgrade(&ctx.inner);
        thread::Builder::new()
            .name("rdd-context-deadline".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = done.recv_timeout(timeout) {
                    if let Some(inner) = weak.upgrade() {
                        inner.finish(DEADLINE_EXCEEDED);
                    }
                }
            })?;
        Ok(ctx)
    }

    /// Request cancellation. Idempotent; the first reason (cancel or deadline) wins.
    pub fn cancel(&self) {
        if self.inner.cancelable {
            self.inner.finish(CANCELED);
        }
    }

    /// Instantaneous check.
    pub fn is_done(&self) -> bool {
        self.inner.current() != ACTIVE
    }

    /// The error describing why the context is done, or `None` while it is active.
    pub fn err(&self) -> Option<EngineError> {
        match self.inner.current() {
            CANCELED => Some(EngineError::Canceled),
            DEADLINE_EXCEEDED => Some(EngineError::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` with the context's error if it is done.
    pub fn check(&self) -> EngineResult<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Channel that becomes ready (disconnected) once the context is done.
    ///
    /// Nothing is ever sent on it; use it as a `recv` arm of `crossbeam_channel::select!`.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done_rx
    }

    /// Block until the context is done.
    pub fn wait(&self) {
        let _ = self.inner.done_rx.recv();
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.current() {
            CANCELED => "canceled",
            DEADLINE_EXCEEDED => "deadline_exceeded",
            _ => "active",
        };
        f.debug_struct("Context")
            .field("state", &state)
            .field("cancelable", &self.inner.cancelable)
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}
