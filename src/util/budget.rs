//! Cooperative cancellation and deadlines for gallery sweeps.
//!
//! Budgets are checked between (subject, model) units of work only; a distance
//! computation that has started always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared flag used to request cancellation from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. All clones observe the request.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Limits on how long a sweep may keep fanning out.
#[derive(Clone, Debug, Default)]
pub struct Budget {
    /// Optional cancellation token.
    pub cancel: Option<CancelToken>,
    /// Optional wall-clock deadline.
    pub deadline: Option<Instant>,
}

impl Budget {
    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Attaches a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attaches a deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns true when no further work should be started.
    pub fn is_exhausted(&self) -> bool {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}
