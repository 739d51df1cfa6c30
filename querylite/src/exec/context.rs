// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cancellation contexts for query execution
//!
//! Contexts form a tree. Cancelling a context cancels every context derived
//! from it, never its parent. A derived context comes with a `CancelGuard`
//! that cancels it when dropped, so the child is released on every exit
//! path of the code that created it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a context stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` was called on this context or an ancestor
    Cancelled,
    /// The deadline of this context or an ancestor passed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "context cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

struct ContextInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<Context>,
}

/// Revocable execution context, cheap to clone and safe to cancel from any thread
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Root context that is never cancelled on its own
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline: None,
                parent: None,
            }),
        }
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Derive a cancellable child context
    pub fn with_cancel(&self) -> (Context, CancelGuard) {
        let child = self.child(None);
        let guard = CancelGuard {
            context: child.clone(),
        };
        (child, guard)
    }

    /// Derive a child context that cancels itself after `timeout`
    pub fn with_timeout(&self, timeout: Duration) -> (Context, CancelGuard) {
        let child = self.child(Some(Instant::now() + timeout));
        let guard = CancelGuard {
            context: child.clone(),
        };
        (child, guard)
    }

    /// Cancel this context and everything derived from it
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Reason this context is done, or `None` while it is live
    pub fn reason(&self) -> Option<CancelReason> {
        let mut current = Some(self);
        let now = Instant::now();
        while let Some(ctx) = current {
            if ctx.inner.cancelled.load(Ordering::SeqCst) {
                return Some(CancelReason::Cancelled);
            }
            if ctx.inner.deadline.is_some_and(|deadline| now >= deadline) {
                return Some(CancelReason::DeadlineExceeded);
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Earliest deadline along the ancestor chain
    pub fn deadline(&self) -> Option<Instant> {
        let own = self.inner.deadline;
        let inherited = self.inner.parent.as_ref().and_then(Context::deadline);
        match (own, inherited) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("reason", &self.reason())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

/// Cancels its context when dropped
#[must_use = "dropping the guard cancels the context immediately"]
pub struct CancelGuard {
    context: Context,
}

impl CancelGuard {
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Cancel now rather than at the end of the scope
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.context.cancel();
    }
}

impl fmt::Debug for CancelGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelGuard")
            .field("context", &self.context)
            .finish()
    }
}
