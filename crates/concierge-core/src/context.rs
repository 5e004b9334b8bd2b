//! Deadline-bearing, cancellable context for one conversation turn.
//!
//! `TurnContext` bundles what flows through a turn: the request id, the
//! absolute deadline, and a cancellation token. `child_with_timeout()` derives
//! a narrower scope (the title sub-deadline) that can never outlive its parent.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use concierge_types::error::Interrupted;

/// Cancellation scope and deadline shared by the tasks of one turn.
///
/// The cancellation token forms a tree: cancelling a parent cancels all
/// children, but not vice versa. Work is bounded by wrapping its future in
/// [`TurnContext::run`]; when the scope ends the future is dropped, which
/// aborts any in-flight collaborator call.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Unique identifier for this turn (shared across the tree).
    pub request_id: Uuid,
    /// Absolute point in time after which the work is abandoned.
    pub deadline: Instant,
    /// Cancellation token -- child tokens are derived from the parent.
    pub cancellation: CancellationToken,
}

impl TurnContext {
    /// Create a root context that expires `timeout` from now.
    pub fn new(request_id: Uuid, timeout: Duration) -> Self {
        Self {
            request_id,
            deadline: Instant::now() + timeout,
            cancellation: CancellationToken::new(),
        }
    }

    /// Derive a child scope whose deadline is `min(parent, now + timeout)`.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        Self {
            request_id: self.request_id,
            deadline: candidate.min(self.deadline),
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Time left until the deadline (zero once it has passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Check whether this context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this context (and all child contexts derived from it).
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Drive `fut` to completion unless the scope is cancelled or expires first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Interrupted::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => {
                res.map_err(|_| Interrupted::DeadlineExceeded)
            }
        }
    }
}
