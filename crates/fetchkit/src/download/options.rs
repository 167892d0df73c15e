//! Functional options for download operations

use std::sync::Arc;

use sha2::digest::DynDigest;

use super::checksum::ChecksumVerifier;
use super::error::{DownloadError, Result};
use super::queue::Queue;

/// One configuration function for a download.
///
/// Options are applied in the order given; the first failing option aborts
/// the download before any I/O happens.
pub struct DownloadOption(OptionFn);

type OptionFn = Box<dyn FnOnce(&mut DownloadOptions) -> Result<()> + Send>;

/// Resolved per-transfer settings.
#[derive(Debug, Default)]
pub(crate) struct DownloadOptions {
    pub(crate) checksum: Option<ChecksumVerifier>,
    pub(crate) progress: bool,
    pub(crate) skip_existing: bool,
    pub(crate) batch: Option<BatchMode>,
}

/// How a transfer relates to a concurrency group. Set at most once.
#[derive(Debug)]
pub(crate) enum BatchMode {
    /// Create a new queue with this concurrency limit (0 = unlimited).
    New(usize),
    /// Join the queue of the handle this transfer was added through.
    Existing(Arc<Queue>),
}

impl DownloadOptions {
    pub(crate) fn resolve(options: impl IntoIterator<Item = DownloadOption>) -> Result<Self> {
        let mut resolved = Self::default();
        for option in options {
            (option.0)(&mut resolved)?;
        }

        Ok(resolved)
    }

    /// Resolves the batch option into the owning queue. No batch request
    /// yields a private unlimited queue for this one transfer.
    pub(crate) fn take_queue(&mut self) -> Arc<Queue> {
        match self.batch.take() {
            Some(BatchMode::New(max_concurrent)) => Arc::new(Queue::new(max_concurrent)),
            Some(BatchMode::Existing(queue)) => queue,
            None => Arc::new(Queue::new(0)),
        }
    }
}

/// Verify the downloaded bytes against `expected`, the hex digest produced
/// by `hasher`'s algorithm (e.g. `sha2::Sha256::new()`).
pub fn with_checksum<H>(hasher: H, expected: impl Into<String>) -> DownloadOption
where
    H: DynDigest + Send + 'static,
{
    let expected = expected.into();
    DownloadOption(Box::new(move |opts| {
        if expected.is_empty() {
            return Err(DownloadError::Configuration(
                "expected checksum must not be empty".into(),
            ));
        }

        opts.checksum = Some(ChecksumVerifier::new(
            Box::new(hasher),
            expected.to_ascii_lowercase(),
        ));
        Ok(())
    }))
}

/// Log transfer progress, throttled to at most one report per second.
pub fn with_progress() -> DownloadOption {
    DownloadOption(Box::new(|opts| {
        opts.progress = true;
        Ok(())
    }))
}

/// Report success immediately when the destination file already exists,
/// without reading the source stream.
pub fn with_skip_existing() -> DownloadOption {
    DownloadOption(Box::new(|opts| {
        opts.skip_existing = true;
        Ok(())
    }))
}

/// Run this download as the first member of a new batch. Transfers added
/// through the returned handle share one concurrency limit;
/// `max_concurrent == 0` means unlimited.
pub fn with_batch(max_concurrent: usize) -> DownloadOption {
    DownloadOption(Box::new(move |opts| {
        if opts.batch.is_some() {
            return Err(DownloadError::Configuration(
                "batch mode already set for this download".into(),
            ));
        }

        opts.batch = Some(BatchMode::New(max_concurrent));
        Ok(())
    }))
}

/// Force membership in an existing queue. Prepended by `add`, so a
/// caller-supplied [`with_batch`] on an added transfer fails to apply.
pub(crate) fn with_queue(queue: Arc<Queue>) -> DownloadOption {
    DownloadOption(Box::new(move |opts| {
        if opts.batch.is_some() {
            return Err(DownloadError::Configuration(
                "batch mode already set for this download".into(),
            ));
        }

        opts.batch = Some(BatchMode::Existing(queue));
        Ok(())
    }))
}
