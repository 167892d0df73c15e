//! Concurrent download management.
//!
//! The executor streams a byte source into a temp file created next to the
//! destination and atomically renames it into place; a failed or cancelled
//! transfer never leaves a partial destination behind. [`Queue`] coordinates
//! batches of transfers with bounded concurrency, drain-style shutdown, and
//! aggregated errors; [`DownloadHandle`] tracks one transfer and can enqueue
//! siblings into the same batch.

pub mod error;

mod checksum;
mod handle;
mod options;
mod progress;
mod queue;
mod stream;


pub use error::{BatchError, DownloadError, FileOp, Result};
pub use handle::{DownloadHandle, start_download};
pub use options::{DownloadOption, with_batch, with_checksum, with_progress, with_skip_existing};
pub use queue::Queue;
pub use stream::stream_to_file;

pub(crate) use options::{DownloadOptions, with_queue};
pub(crate) use stream::run as run_transfer;

/// Result of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The destination file was written and atomically published.
    Downloaded { bytes: u64 },
    /// The destination already existed and skip-existing was requested.
    SkippedExisting,
}
