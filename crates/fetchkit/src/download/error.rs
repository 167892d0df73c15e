//! Error types for the download subsystem

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Custom error types for download operations
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Rejected before any I/O happened (empty destination, conflicting
    /// batch settings, invalid checksum option).
    #[error("invalid download configuration: {0}")]
    Configuration(String),

    #[error("content length mismatch: expected {expected} bytes, got {actual}")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The cancellation scope ended while the transfer was in flight.
    #[error("download cancelled")]
    Cancelled,

    /// The owning queue was shut down before this transfer cleared admission.
    #[error("download group is shut down")]
    GroupShutdown,

    #[error("unexpected status {status} from '{url}'")]
    UnexpectedStatus { status: u16, url: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reading download stream")]
    Stream {
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed for '{path}'")]
    Io {
        operation: FileOp,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// File operation named in I/O error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    CreateDir,
    Create,
    Write,
    Flush,
    Rename,
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileOp::CreateDir => "creating directory",
            FileOp::Create => "creating temp file",
            FileOp::Write => "writing",
            FileOp::Flush => "flushing",
            FileOp::Rename => "renaming",
        };
        f.write_str(name)
    }
}

/// Composite error returned by [`Queue::wait`]: every error recorded across
/// the batch, in completion order. Members are shared with the individual
/// [`DownloadHandle`] outcomes, so testing a member against an error observed
/// on a handle compares the same value.
///
/// [`Queue::wait`]: super::Queue::wait
/// [`DownloadHandle`]: super::DownloadHandle
#[derive(Debug, Clone)]
pub struct BatchError {
    errors: Vec<Arc<DownloadError>>,
}

impl BatchError {
    pub(crate) fn new(errors: Vec<Arc<DownloadError>>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate the member errors so callers can test for a specific kind
    /// among the joined set.
    pub fn iter(&self) -> impl Iterator<Item = &DownloadError> {
        self.errors.iter().map(|e| e.as_ref())
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} download(s) failed: ", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}
