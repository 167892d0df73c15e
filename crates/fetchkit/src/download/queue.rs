//! Concurrency group coordinating a batch of asynchronous transfers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;

use super::error::{BatchError, DownloadError, Result};
use super::handle::DownloadHandle;

/// Tracks a batch of concurrent transfers: bounded admission, drain-style
/// shutdown, and aggregated errors.
///
/// The queue is passive. Each transfer runs as its own tokio task; the queue
/// only holds the completion counter, the optional admission gate, the
/// shutdown flag, and the error list. Admission order among parked tasks is
/// not FIFO; the gate is a capacity limit, not a priority queue.
#[derive(Debug)]
pub struct Queue {
    /// Number of still-running transfers, observed through watch receivers
    /// so `wait` cannot miss the final decrement.
    running: watch::Sender<usize>,
    gate: Option<Arc<Semaphore>>,
    shutdown: AtomicBool,
    errors: Mutex<Vec<Arc<DownloadError>>>,
}

impl Queue {
    /// Creates a queue limited to `max_concurrent` simultaneously running
    /// transfers. `max_concurrent == 0` means unlimited.
    pub fn new(max_concurrent: usize) -> Self {
        let (running, _) = watch::channel(0);
        Self {
            running,
            gate: (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent))),
            shutdown: AtomicBool::new(false),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Prevents transfers that have not yet cleared admission from running.
    /// Already-admitted transfers drain normally; combine with per-transfer
    /// cancellation for a hard stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Blocks until every transfer started on this queue, including ones
    /// added while waiting, has finished. Returns all recorded errors
    /// joined; safe to call repeatedly and from multiple callers.
    pub async fn wait(&self) -> std::result::Result<(), BatchError> {
        let mut running = self.running.subscribe();
        // The current value is checked first, so an already-idle batch
        // returns immediately. The sender lives in `self`.
        let _ = running.wait_for(|running| *running == 0).await;

        let errors = self
            .errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BatchError::new(errors))
        }
    }

    /// Launches `work` as a task managed by this queue and returns a handle
    /// for the individual transfer.
    ///
    /// The task derives a private child token from `parent`, waits for gate
    /// admission if a limit is configured, then checks the shutdown flag.
    /// The shutdown check deliberately comes after admission: a transfer
    /// parked at the gate is released by cancellation, not by `shutdown`.
    pub fn start<F, Fut>(self: &Arc<Self>, parent: &CancellationToken, work: F) -> DownloadHandle
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = parent.child_token();
        let (outcome_tx, outcome_rx) = watch::channel(None);

        self.running.send_modify(|running| *running += 1);

        let queue = Arc::clone(self);
        let task_token = token.clone();
        tokio::spawn(async move {
            let outcome = match run_managed(&queue, &task_token, work).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    let err = Arc::new(err);
                    queue.record_error(Arc::clone(&err));
                    Err(err)
                }
            };

            // Publish the terminal outcome before the counter goes down, so
            // a handle observed as finished always has its error readable.
            task_token.cancel();
            let _ = outcome_tx.send(Some(outcome));
            queue.running.send_modify(|running| *running -= 1);
        });

        DownloadHandle::new(Arc::clone(self), parent.clone(), token, outcome_rx)
    }

    pub(crate) fn record_error(&self, err: Arc<DownloadError>) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }
}

/// Admission, shutdown check, then the work itself. The permit, if any, is
/// held until this returns, releasing the gate slot on every exit path.
async fn run_managed<F, Fut>(queue: &Arc<Queue>, token: &CancellationToken, work: F) -> Result<()>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let _permit = match queue.gate.as_ref() {
        Some(gate) => {
            let gate = Arc::clone(gate);
            tokio::select! {
                permit = gate.acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    // The gate is never closed while the queue is alive.
                    Err(_) => return Err(DownloadError::GroupShutdown),
                },
                () = token.cancelled() => return Err(DownloadError::Cancelled),
            }
        }
        None => None,
    };

    if queue.shutdown.load(Ordering::Acquire) {
        return Err(DownloadError::GroupShutdown);
    }

    work(token.clone()).await
}
