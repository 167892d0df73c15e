//! Per-transfer handles for asynchronous downloads and batching.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::error::{BatchError, DownloadError, Result};
use super::options::{DownloadOption, DownloadOptions, with_queue};
use super::queue::Queue;
use super::stream;

pub(crate) type TaskOutcome = std::result::Result<(), Arc<DownloadError>>;

/// Launches an asynchronous transfer and returns a handle for it.
///
/// `parent` is the caller's cancellation scope; the transfer runs under a
/// private child scope that [`DownloadHandle::cancel`] ends without touching
/// siblings. Passing [`with_batch`] makes this transfer the first member of
/// a new batch; further transfers join it through [`DownloadHandle::add`].
/// Without a batch option the transfer gets a private unlimited queue.
///
/// [`with_batch`]: super::with_batch
pub fn start_download<R>(
    parent: &CancellationToken,
    body: R,
    declared_len: Option<u64>,
    dest_path: impl Into<PathBuf>,
    options: impl IntoIterator<Item = DownloadOption>,
) -> Result<DownloadHandle>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut opts = DownloadOptions::resolve(options)?;
    let queue = opts.take_queue();

    Ok(launch(
        &queue,
        parent,
        body,
        declared_len,
        dest_path.into(),
        opts,
    ))
}

fn launch<R>(
    queue: &Arc<Queue>,
    parent: &CancellationToken,
    body: R,
    declared_len: Option<u64>,
    dest_path: PathBuf,
    opts: DownloadOptions,
) -> DownloadHandle
where
    R: AsyncRead + Send + Unpin + 'static,
{
    queue.start(parent, move |token| async move {
        stream::run(&token, body, declared_len, &dest_path, opts)
            .await
            .map(|_| ())
    })
}

/// Handle to one in-flight or completed asynchronous transfer.
///
/// [`outcome`] answers "did *this* transfer succeed"; [`wait`] answers "is
/// the *whole batch* done". The asymmetry is deliberate.
///
/// [`outcome`]: DownloadHandle::outcome
/// [`wait`]: DownloadHandle::wait
pub struct DownloadHandle {
    queue: Arc<Queue>,
    parent: CancellationToken,
    cancel: CancellationToken,
    outcome: watch::Receiver<Option<TaskOutcome>>,
}

impl DownloadHandle {
    pub(crate) fn new(
        queue: Arc<Queue>,
        parent: CancellationToken,
        cancel: CancellationToken,
        outcome: watch::Receiver<Option<TaskOutcome>>,
    ) -> Self {
        Self {
            queue,
            parent,
            cancel,
            outcome,
        }
    }

    /// Already-terminal handle for transfers that failed option resolution.
    pub(crate) fn failed(
        queue: Arc<Queue>,
        parent: CancellationToken,
        err: Arc<DownloadError>,
    ) -> Self {
        let (_tx, outcome) = watch::channel(Some(Err(err)));
        Self {
            queue,
            parent,
            cancel: CancellationToken::new(),
            outcome,
        }
    }

    /// True once this transfer's task has exited.
    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Completion signal: resolves when this transfer's task exits. Usable
    /// in `select!` alongside other events.
    pub async fn done(&self) {
        let mut outcome = self.outcome.clone();
        let _ = outcome.wait_for(|terminal| terminal.is_some()).await;
    }

    /// Blocks until this transfer completes and returns its terminal
    /// result. Only this transfer's; see [`wait`](DownloadHandle::wait) for
    /// the whole batch.
    pub async fn outcome(&self) -> std::result::Result<(), Arc<DownloadError>> {
        self.done().await;
        self.outcome
            .borrow()
            .clone()
            .unwrap_or(Err(Arc::new(DownloadError::Cancelled)))
    }

    /// Blocks until every transfer in the batch completes and returns all
    /// recorded errors joined.
    pub async fn wait(&self) -> std::result::Result<(), BatchError> {
        self.queue.wait().await
    }

    /// Cancels this transfer's private scope. Siblings in the same batch
    /// are unaffected.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Enqueues another transfer into the same batch, sharing its
    /// concurrency limit.
    ///
    /// The batch membership is forced to this handle's queue; passing
    /// [`with_batch`] here is a configuration error. Such errors are
    /// recorded in the group so a later [`wait`](DownloadHandle::wait)
    /// surfaces them, and the returned handle reports the same error from
    /// [`outcome`](DownloadHandle::outcome) immediately.
    ///
    /// [`with_batch`]: super::with_batch
    pub fn add<R>(
        &self,
        body: R,
        declared_len: Option<u64>,
        dest_path: impl Into<PathBuf>,
        options: impl IntoIterator<Item = DownloadOption>,
    ) -> DownloadHandle
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let forced = std::iter::once(with_queue(Arc::clone(&self.queue))).chain(options);
        let mut opts = match DownloadOptions::resolve(forced) {
            Ok(opts) => opts,
            Err(err) => {
                let err = Arc::new(err);
                self.queue.record_error(Arc::clone(&err));
                return DownloadHandle::failed(Arc::clone(&self.queue), self.parent.clone(), err);
            }
        };

        let queue = opts.take_queue();
        launch(
            &queue,
            &self.parent,
            body,
            declared_len,
            dest_path.into(),
            opts,
        )
    }

    pub(crate) fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    pub(crate) fn parent(&self) -> &CancellationToken {
        &self.parent
    }
}
