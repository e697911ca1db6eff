//! User cancellation of an in-flight call.
//!
//! A signal handler calls [`Interrupt::trigger`] from its own thread; the
//! session races each call against [`Interrupt::triggered`].  Each call
//! starts from a fresh token, so a stray trigger while idle does not cancel
//! the next call.  [`Interrupt::trigger`] reports whether a call was armed,
//! letting the handler exit the process instead when nothing is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// A resettable cancellation flag shared between a signal handler and a session.
#[derive(Debug, Default)]
pub struct Interrupt {
    token: Mutex<CancellationToken>,
    armed: AtomicBool,
}

impl Interrupt {
    /// Creates an untriggered interrupt.
    pub fn new() -> Self {
        Self::default()
    }

    fn token(&self) -> MutexGuard<'_, CancellationToken> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the call in flight, if any.  Returns false when no call was
    /// armed.
    pub fn trigger(&self) -> bool {
        self.token().cancel();
        self.armed.load(Ordering::SeqCst)
    }

    /// True if triggered since the last arm.
    pub fn is_triggered(&self) -> bool {
        self.token().is_cancelled()
    }

    /// True while a call is in flight.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Arms a fresh token for the next call.
    pub fn arm(&self) {
        let mut token = self.token();
        *token = CancellationToken::new();
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Marks the call as finished.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// Resolves once [`Interrupt::trigger`] is called.
    pub async fn triggered(&self) {
        let token = self.token().clone();
        token.cancelled().await;
    }
}
