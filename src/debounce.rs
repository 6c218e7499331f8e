//! Input-rate limiting for live search.
//!
//! Each input event schedules a unit of work after a quiet period. A newer
//! event supersedes any unit still waiting, so only the last one in a burst
//! runs. Superseding never interrupts a unit that has already started.
//!
//! Every scheduled unit gets a ticket from a shared sequence counter. When
//! its delay elapses the task compares its ticket with the current sequence
//! and runs only if nothing newer was scheduled. The previous task is also
//! aborted, but the ticket check is what guarantees "latest wins" even if
//! the abort arrives after the sleep has already completed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Debouncer {
    delay: Duration,
    seq: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            seq: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Schedule `work` to run after the delay, superseding whatever is pending.
    ///
    /// Returns the ticket assigned to this unit. Must be called from within a
    /// tokio runtime.
    pub fn schedule<F>(&mut self, work: F) -> u64
    where
        F: FnOnce() + Send + 'static,
    {
        let ticket = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        let seq = Arc::clone(&self.seq);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if seq.load(Ordering::SeqCst) == ticket {
                work();
            } else {
                debug!(ticket, "debounced unit superseded");
            }
        }));
        ticket
    }

    /// Drop the pending unit, if any, without running it.
    pub fn cancel(&mut self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Wait for the pending unit to fire (or be superseded) and finish.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            // An aborted task yields a JoinError; nothing left to wait for.
            let _ = pending.await;
        }
    }

    /// Ticket of the most recently scheduled unit (0 before the first).
    pub fn latest(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
