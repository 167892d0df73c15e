//! Batched download example: several URLs sharing one concurrency limit.
//!
//! Usage: cargo run --example batch_download -- <dest-dir> <url>...

use std::path::PathBuf;

use fetchkit::{Client, ClientConfig, with_batch};
use tokio_util::sync::CancellationToken;

const MAX_CONCURRENT: usize = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(dest_dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: batch_download <dest-dir> <url>...");
        std::process::exit(2);
    };
    let urls: Vec<String> = args.collect();
    if urls.is_empty() {
        eprintln!("usage: batch_download <dest-dir> <url>...");
        std::process::exit(2);
    }

    let client = Client::new(&ClientConfig::default())?;
    let cancel = CancellationToken::new();

    let mut handles = Vec::with_capacity(urls.len());
    for (i, url) in urls.iter().enumerate() {
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("download-{i}"));
        let dest = dest_dir.join(file_name);

        let handle = match handles.first() {
            None => client.download_async(&cancel, url, dest, [with_batch(MAX_CONCURRENT)])?,
            Some(first) => client.add_to_batch(first, url, dest, []),
        };
        handles.push(handle);
    }

    // Any member's wait() covers the whole batch.
    match handles[0].wait().await {
        Ok(()) => println!("downloaded {} file(s)", handles.len()),
        Err(batch) => {
            eprintln!("{batch}");
            std::process::exit(1);
        }
    }

    Ok(())
}
