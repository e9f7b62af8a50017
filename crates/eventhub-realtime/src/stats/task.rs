//! Owned, cancellable background task for per-socket statistics.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::{CancellationToken, DropGuard};

/// How long [`StatsTask::cancel`] waits before aborting.
pub const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// A spawned ticker that stops when cancelled or dropped.
///
/// The task receives a child token and must return once it fires.
#[derive(Debug)]
pub struct StatsTask {
    guard: DropGuard,
    join: JoinHandle<()>,
}

impl StatsTask {
    /// Spawn `body` with a fresh cancellation token.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let join = tokio::spawn(body(token.clone()));
        Self {
            guard: token.drop_guard(),
            join,
        }
    }

    /// Whether the task body has returned.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Cancel the task and wait up to [`CANCEL_GRACE`] for it to return.
    ///
    /// A task still running after the grace period is aborted.
    pub async fn cancel(self) {
        drop(self.guard);
        let mut join = self.join;
        match time::timeout(CANCEL_GRACE, &mut join).await {
            Ok(Err(e)) if e.is_panic() => {
                tracing::error!(error = %e, "Stats task panicked");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(grace = ?CANCEL_GRACE, "Stats task ignored cancellation, aborting");
                join.abort();
            }
        }
    }
}
