//! Minimal example: download one file with progress logging.
//!
//! Usage: cargo run --example simple_download -- <url> <dest-path>

use fetchkit::{Client, ClientConfig, with_progress, with_skip_existing};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(url), Some(dest)) = (args.next(), args.next()) else {
        eprintln!("usage: simple_download <url> <dest-path>");
        std::process::exit(2);
    };

    let client = Client::new(&ClientConfig::default())?;
    let outcome = client
        .download(
            &CancellationToken::new(),
            &url,
            &dest,
            [with_progress(), with_skip_existing()],
        )
        .await?;

    println!("{outcome:?}");
    Ok(())
}
