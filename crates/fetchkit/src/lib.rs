//! fetchkit
//!
//! Streaming HTTP downloads with atomic publishing, optional checksum
//! verification, throttled progress reporting, and batched concurrency.
//!
//! Every transfer is written to a uniquely named temp file in the
//! destination's directory and renamed into place only after all checks
//! pass, so the destination path only ever shows either the old content or
//! the complete new content.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fetchkit::{Client, ClientConfig, with_batch, with_checksum, with_progress};
//! use sha2::{Digest, Sha256};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> fetchkit::Result<()> {
//! let client = Client::new(&ClientConfig::default())?;
//! let cancel = CancellationToken::new();
//!
//! // Synchronous download with checksum verification and progress logs.
//! let expected = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
//! client
//!     .download(&cancel, "https://example.com/file.bin", "/tmp/file.bin", [
//!         with_checksum(Sha256::new(), expected),
//!         with_progress(),
//!     ])
//!     .await?;
//!
//! // Batched async downloads sharing one concurrency limit.
//! let first = client.download_async(
//!     &cancel,
//!     "https://example.com/a.bin",
//!     "/tmp/a.bin",
//!     [with_batch(4)],
//! )?;
//! let second = client.add_to_batch(&first, "https://example.com/b.bin", "/tmp/b.bin", []);
//!
//! // `outcome` reports one transfer; `wait` blocks for the whole batch.
//! if second.outcome().await.is_err() {
//!     eprintln!("b.bin failed");
//! }
//! if let Err(batch) = first.wait().await {
//!     eprintln!("{batch}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The download engine is also usable without the HTTP client: hand any
//! `AsyncRead` to [`stream_to_file`] (single-shot) or [`start_download`]
//! (asynchronous, batchable).

pub mod client;
pub mod config;
pub mod download;

pub use client::Client;
pub use config::ClientConfig;
pub use download::{
    BatchError, DownloadError, DownloadHandle, DownloadOption, DownloadOutcome, FileOp, Queue,
    Result, start_download, stream_to_file, with_batch, with_checksum, with_progress,
    with_skip_existing,
};
