//! Fetch a file with concurrent range requests
//!
//! This example demonstrates the core functionality of range-dl:
//! - Creating a downloader instance
//! - Subscribing to events
//! - Downloading a resource in parallel ranges
//! - Re-fetching whatever ranges failed
//!
//! ```bash
//! cargo run --example fetch_file -- <url> [destination] [chunks]
//! ```

use range_dl::{Config, Event, RangeDownloader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or("usage: fetch_file <url> [destination] [chunks]")?;
    let destination = args.next().unwrap_or_else(|| "download.bin".to_string());
    let chunk_count = match args.next() {
        Some(value) => value.parse()?,
        None => Config::default().chunk_count,
    };

    let downloader = RangeDownloader::new(Config {
        chunk_count,
        ..Default::default()
    })?;

    // Subscribe to events
    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Probed {
                    total_size,
                    integrity_tag,
                } => {
                    println!(
                        "Resource is {} bytes (etag: {})",
                        total_size,
                        integrity_tag.as_deref().unwrap_or("none")
                    );
                }
                Event::Planned { chunks } => {
                    println!("Fetching {} ranges", chunks);
                }
                Event::ChunkFailed { index, error } => {
                    println!("✗ Range #{} failed: {}", index, error);
                }
                Event::ChunkWritten {
                    bytes_written,
                    total_bytes,
                    ..
                } => {
                    let percent = if total_bytes == 0 {
                        100.0
                    } else {
                        bytes_written as f64 / total_bytes as f64 * 100.0
                    };
                    println!("  {:.1}% ({} / {} bytes)", percent, bytes_written, total_bytes);
                }
                Event::Finished { succeeded, failed } => {
                    println!("Finished: {} ranges ok, {} failed", succeeded, failed.len());
                }
                Event::ChunkDownloaded { .. } => {}
            }
        }
    });

    let summary = downloader.download(&url, &destination).await?;
    println!("Time taken: {:?}", summary.elapsed);

    if summary.is_complete() {
        println!("✓ Saved {} bytes to {}", summary.bytes_written, destination);
        return Ok(());
    }

    let missing = summary.missing_ranges();
    println!("Retrying {} missing ranges", missing.len());
    let outcome = downloader.refetch(&url, &destination, &missing).await?;

    if outcome.is_complete() {
        println!("✓ Saved {} bytes to {}", summary.descriptor.total_size, destination);
    } else {
        println!(
            "✗ Download incomplete, missing ranges: {:?}",
            outcome.failed
        );
        std::process::exit(1);
    }

    Ok(())
}
