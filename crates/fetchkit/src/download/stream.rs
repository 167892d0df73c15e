//! Transfer executor: streams a byte source into a temp file and atomically
//! publishes it to the destination path.

use std::path::Path;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::DownloadOutcome;
use super::error::{DownloadError, FileOp, Result};
use super::options::{DownloadOption, DownloadOptions};
use super::progress::ProgressTracker;

/// Temp files are created in the destination's directory so the final
/// rename never crosses a filesystem boundary.
const TEMP_PREFIX: &str = ".fetchkit-";

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Streams `body` to `dest_path`, applying `options` in order.
///
/// The bytes land in a uniquely named temp file next to the destination and
/// are renamed into place only after the length and checksum checks pass; on
/// any failure the temp file is removed and the destination is untouched.
/// `declared_len` is the expected byte count (`None` when unknown); a
/// known length that disagrees with the copied count fails the transfer.
///
/// The cancellation token is checked before every read, so cancellation
/// latency is bounded by the source's read latency.
pub async fn stream_to_file<R>(
    cancel: &CancellationToken,
    body: R,
    declared_len: Option<u64>,
    dest_path: impl AsRef<Path>,
    options: impl IntoIterator<Item = DownloadOption>,
) -> Result<DownloadOutcome>
where
    R: AsyncRead + Unpin,
{
    let opts = DownloadOptions::resolve(options)?;
    if opts.batch.is_some() {
        return Err(DownloadError::Configuration(
            "batch options are not valid for single-shot downloads".into(),
        ));
    }

    run(cancel, body, declared_len, dest_path.as_ref(), opts).await
}

/// Executor body shared with the async/batched entry points, which resolve
/// options themselves.
pub(crate) async fn run<R>(
    cancel: &CancellationToken,
    mut body: R,
    declared_len: Option<u64>,
    dest_path: &Path,
    mut opts: DownloadOptions,
) -> Result<DownloadOutcome>
where
    R: AsyncRead + Unpin,
{
    if dest_path.as_os_str().is_empty() {
        return Err(DownloadError::Configuration(
            "destination path must not be empty".into(),
        ));
    }

    if opts.skip_existing && fs::try_exists(dest_path).await.unwrap_or(false) {
        info!(path = %dest_path.display(), "skipping existing file");
        return Ok(DownloadOutcome::SkippedExisting);
    }

    debug!(path = %dest_path.display(), ?declared_len, "starting download");

    let dir = match dest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .await
        .map_err(|e| io_err(FileOp::CreateDir, dir, e))?;

    // TempPath removes the file on drop, which covers every failure path
    // below; only a successful persist defuses it.
    let temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| io_err(FileOp::Create, dir, e))?;
    let (file, temp_path) = temp.into_parts();
    let mut file = fs::File::from_std(file);

    let mut progress = opts.progress.then(|| ProgressTracker::new(declared_len));
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut copied: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(path = %dest_path.display(), "transfer cancelled");
            return Err(DownloadError::Cancelled);
        }

        let n = body
            .read(&mut buf)
            .await
            .map_err(|e| DownloadError::Stream { source: e })?;
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n])
            .await
            .map_err(|e| io_err(FileOp::Write, &temp_path, e))?;

        if let Some(checksum) = opts.checksum.as_mut() {
            checksum.update(&buf[..n]);
        }
        if let Some(progress) = progress.as_mut() {
            progress.record(n as u64);
        }
        copied += n as u64;
    }

    if let Some(expected) = declared_len {
        if copied != expected {
            return Err(DownloadError::ContentLengthMismatch {
                expected,
                actual: copied,
            });
        }
    }

    if let Some(checksum) = opts.checksum.take() {
        checksum.verify()?;
    }

    file.flush()
        .await
        .map_err(|e| io_err(FileOp::Flush, &temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_err(FileOp::Flush, &temp_path, e))?;
    // Close before the rename; the rename itself is not interruptible.
    drop(file.into_std().await);

    temp_path
        .persist(dest_path)
        .map_err(|e| DownloadError::Io {
            operation: FileOp::Rename,
            path: dest_path.to_path_buf(),
            source: e.error,
        })?;

    debug!(path = %dest_path.display(), bytes = copied, "download persisted");

    Ok(DownloadOutcome::Downloaded { bytes: copied })
}

fn io_err(operation: FileOp, path: &Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io {
        operation,
        path: path.to_path_buf(),
        source,
    }
}
