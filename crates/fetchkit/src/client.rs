//! HTTP client integration: executes requests and hands validated response
//! streams to the download executor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::download::{
    DownloadError, DownloadHandle, DownloadOption, DownloadOptions, DownloadOutcome, Queue,
    Result, run_transfer, stream_to_file, with_queue,
};

/// HTTP client with integrated streaming downloads.
///
/// The client validates the response status before any bytes are handed to
/// the download executor, so the executor only ever sees an
/// already-accepted stream.
pub struct Client {
    http: reqwest::Client,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { http })
    }

    /// Downloads `url` to `dest_path` and returns when the file is
    /// persisted (or the transfer failed). The response's Content-Length,
    /// when present, is enforced against the bytes received.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dest_path: impl AsRef<Path>,
        options: impl IntoIterator<Item = DownloadOption>,
    ) -> Result<DownloadOutcome> {
        debug!(url, "downloading");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let declared_len = response.content_length();
        stream_to_file(cancel, body_reader(response), declared_len, dest_path, options).await
    }

    /// Fire-and-forget variant of [`download`](Client::download): the
    /// request is sent inside a queue-managed task, so a configured batch
    /// limit also paces request issuance. Pass
    /// [`with_batch`](crate::with_batch) to start a batch and
    /// [`add_to_batch`](Client::add_to_batch) to grow it.
    pub fn download_async(
        &self,
        cancel: &CancellationToken,
        url: &str,
        dest_path: impl Into<PathBuf>,
        options: impl IntoIterator<Item = DownloadOption>,
    ) -> Result<DownloadHandle> {
        let mut opts = DownloadOptions::resolve(options)?;
        let queue = opts.take_queue();

        Ok(self.spawn_fetch(&queue, cancel, url.to_string(), dest_path.into(), opts))
    }

    /// Enqueues another URL download into the batch owned by `handle`.
    ///
    /// Mirrors [`DownloadHandle::add`]: batch membership is forced to the
    /// handle's queue, and a conflicting batch option is recorded in the
    /// group and reported by the returned handle.
    pub fn add_to_batch(
        &self,
        handle: &DownloadHandle,
        url: &str,
        dest_path: impl Into<PathBuf>,
        options: impl IntoIterator<Item = DownloadOption>,
    ) -> DownloadHandle {
        let forced = std::iter::once(with_queue(Arc::clone(handle.queue()))).chain(options);
        let mut opts = match DownloadOptions::resolve(forced) {
            Ok(opts) => opts,
            Err(err) => {
                let err = Arc::new(err);
                handle.queue().record_error(Arc::clone(&err));
                return DownloadHandle::failed(
                    Arc::clone(handle.queue()),
                    handle.parent().clone(),
                    err,
                );
            }
        };

        let queue = opts.take_queue();
        self.spawn_fetch(&queue, handle.parent(), url.to_string(), dest_path.into(), opts)
    }

    fn spawn_fetch(
        &self,
        queue: &Arc<Queue>,
        parent: &CancellationToken,
        url: String,
        dest_path: PathBuf,
        opts: DownloadOptions,
    ) -> DownloadHandle {
        let http = self.http.clone();
        queue.start(parent, move |token| async move {
            let response = tokio::select! {
                response = http.get(&url).send() => response?,
                () = token.cancelled() => return Err(DownloadError::Cancelled),
            };

            let status = response.status();
            if !status.is_success() {
                return Err(DownloadError::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                });
            }

            let declared_len = response.content_length();
            run_transfer(&token, body_reader(response), declared_len, &dest_path, opts)
                .await
                .map(|_| ())
        })
    }
}

/// Adapts a response body into the byte reader the executor consumes.
fn body_reader(response: reqwest::Response) -> impl AsyncRead + Send + Unpin + 'static {
    StreamReader::new(Box::pin(
        response.bytes_stream().map_err(std::io::Error::other),
    ))
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::download::{with_batch, with_checksum, with_skip_existing};

    async fn serve(route: &str, body: &[u8]) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(&server)
            .await;
        server
    }

    fn test_client() -> Client {
        Client::new(&ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn download_streams_body_to_disk() {
        let payload = b"wiremock payload".to_vec();
        let server = serve("/file.bin", &payload).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("file.bin");

        let outcome = test_client()
            .download(
                &CancellationToken::new(),
                &format!("{}/file.bin", server.uri()),
                &dest,
                [],
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Downloaded {
                bytes: payload.len() as u64
            }
        );
        assert_eq!(std::fs::read(&dest).unwrap(), payload);
    }

    #[tokio::test]
    async fn download_rejects_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.bin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempdir().unwrap();

        let err = test_client()
            .download(
                &CancellationToken::new(),
                &format!("{}/missing.bin", server.uri()),
                dir.path().join("missing.bin"),
                [],
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::UnexpectedStatus { status: 404, .. }
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_verifies_checksum() {
        let payload = b"checksummed payload".to_vec();
        let digest = hex::encode(Sha256::digest(&payload));
        let server = serve("/file.bin", &payload).await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("file.bin");

        test_client()
            .download(
                &CancellationToken::new(),
                &format!("{}/file.bin", server.uri()),
                &dest,
                [with_checksum(Sha256::new(), digest)],
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), payload);
    }

    #[tokio::test]
    async fn download_skips_existing_file() {
        let server = serve("/file.bin", b"fresh bytes").await;
        let dir = tempdir().unwrap();
        let dest = dir.path().join("file.bin");
        std::fs::write(&dest, b"original").unwrap();

        let outcome = test_client()
            .download(
                &CancellationToken::new(),
                &format!("{}/file.bin", server.uri()),
                &dest,
                [with_skip_existing()],
            )
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::SkippedExisting);
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
    }

    #[tokio::test]
    async fn batched_async_downloads_share_a_queue() {
        let server = MockServer::start().await;
        for (route, body) in [("/a.bin", b"alpha".as_slice()), ("/b.bin", b"bravo")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
                .mount(&server)
                .await;
        }
        let dir = tempdir().unwrap();
        let client = test_client();
        let cancel = CancellationToken::new();

        let first = client
            .download_async(
                &cancel,
                &format!("{}/a.bin", server.uri()),
                dir.path().join("a.bin"),
                [with_batch(2)],
            )
            .unwrap();
        let second = client.add_to_batch(
            &first,
            &format!("{}/b.bin", server.uri()),
            dir.path().join("b.bin"),
            [],
        );

        second.wait().await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a.bin")).unwrap(), b"alpha");
        assert_eq!(std::fs::read(dir.path().join("b.bin")).unwrap(), b"bravo");
        assert!(first.is_finished());
        assert!(second.is_finished());
    }
}
