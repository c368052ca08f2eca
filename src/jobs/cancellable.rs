//! Cancellable run primitive
//!
//! Races one long-running future against an externally supplied cancel
//! future and a wall-clock timeout. The same create-two-tasks-and-race
//! shape used to be repeated in every command handler of the bot this
//! service grew out of; it lives here once.
//!
//! Cancellation is cooperative: the work future is handed a [`CancelNotice`]
//! and is expected to check it between items. When the cancel signal or the
//! timer wins the race, the notice is set and the work future is driven to
//! completion (within a grace period) so it stops at its own checkpoint —
//! nothing is torn down mid-item.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Bound on how long stopped work may take to reach its next checkpoint
/// before it is dropped outright. Checkpoints are at most one item apart,
/// so hitting this means the work is stuck, not slow.
const DRAIN_GRACE: Duration = Duration::from_secs(30);

/// Shared cooperative-stop flag.
///
/// Cloned into the work future; cheap to check between items.
#[derive(Clone, Debug, Default)]
pub struct CancelNotice {
    flag: Arc<AtomicBool>,
}

impl CancelNotice {
    /// A fresh, unset notice.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the work to stop at its next checkpoint.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of one cancellable run; produced exactly once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    /// The work finished on its own
    Completed(T),
    /// The external cancel signal won the race
    Cancelled,
    /// The wall-clock budget ran out first
    TimedOut,
}

/// Run `work` until it completes, `cancel` resolves, or `timeout` elapses.
///
/// # Arguments
/// * `work` - The long-running unit (e.g. a batch drive loop); must observe
///   `notice` between items
/// * `cancel` - Resolves at most once, or never, when an out-of-band stop
///   request arrives
/// * `timeout` - Wall-clock bound on the whole run
/// * `notice` - The flag `work` polls; set here when cancel or timeout wins
pub async fn run<T>(
    work: impl Future<Output = T>,
    cancel: impl Future<Output = ()>,
    timeout: Duration,
    notice: CancelNotice,
) -> RunOutcome<T> {
    tokio::pin!(work);
    tokio::pin!(cancel);
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    // Biased polling makes a dead heat deterministic: a stop signal that
    // arrives in the same instant the work would finish still stops it.
    tokio::select! {
        biased;
        _ = &mut cancel => {
            notice.set();
            drain(&mut work).await;
            RunOutcome::Cancelled
        }
        _ = &mut deadline => {
            notice.set();
            drain(&mut work).await;
            RunOutcome::TimedOut
        }
        value = &mut work => RunOutcome::Completed(value),
    }
}

/// Drive stopped work to its next checkpoint so no item is left
/// half-applied.
async fn drain(work: impl Future<Output = impl Sized>) {
    if tokio::time::timeout(DRAIN_GRACE, work).await.is_err() {
        tracing::warn!(
            grace_secs = DRAIN_GRACE.as_secs(),
            "stopped work missed its checkpoint within the drain grace, dropping it"
        );
    }
}
