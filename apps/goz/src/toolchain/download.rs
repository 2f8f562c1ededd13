//! HTTP download of release archives.
//!
//! The response body is streamed into `<name>.tmp` next to the final path and
//! renamed once complete, so a half-written archive never appears under its
//! real name. Failed downloads remove the temporary file. There are no
//! retries: every failure is reported to the caller.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::errors::GozError;

/// Suffix of the in-progress download file.
const TEMP_SUFFIX: &str = ".tmp";

/// Minimum interval between progress redraws.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Returns the archive file name a URL points at: its last path segment.
fn archive_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns the temporary path used while `dest` is being downloaded.
#[must_use]
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(TEMP_SUFFIX);
    dest.with_file_name(name)
}

/// Downloads `url` into `dest_dir` and returns the archive path.
///
/// The file is named after the last URL path segment.
///
/// # Errors
///
/// - `Network` if the request or the body stream fails
/// - `BadStatus` if the server answers with a non-success status
/// - `Io` if the file cannot be created, written or renamed
pub async fn download_archive(url: &str, dest_dir: &Path) -> Result<PathBuf, GozError> {
    let file_name = archive_file_name(url);
    if file_name.is_empty() {
        return Err(GozError::io(
            format!("Download URL has no file name: {url}"),
            std::io::Error::from(std::io::ErrorKind::InvalidInput),
        ));
    }

    let dest = dest_dir.join(file_name);
    download_file(url, &dest).await?;
    Ok(dest)
}

/// Downloads a file from `url` to `dest` with progress display on stderr.
///
/// # Errors
///
/// See [`download_archive`].
pub async fn download_file(url: &str, dest: &Path) -> Result<(), GozError> {
    let temp_path = temp_path(dest);

    eprintln!("goz: downloading {url:?}");
    info!(%url, dest = %dest.display(), "downloading");

    if let Err(e) = download_with_progress(url, &temp_path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, dest).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(GozError::io(
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                dest.display()
            ),
            e,
        ));
    }

    debug!(dest = %dest.display(), "download complete");
    Ok(())
}

/// Streams the response body of `url` into `dest`.
async fn download_with_progress(url: &str, dest: &Path) -> Result<(), GozError> {
    let network = |source| GozError::Network {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder().build().map_err(network)?;
    let response = client.get(url).send().await.map_err(network)?;

    let status = response.status();
    if !status.is_success() {
        return Err(GozError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        });
    }

    let mut progress = Progress::new(response.content_length());

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| GozError::io(format!("Failed to create file: {}", dest.display()), e))?;

    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(network)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| GozError::io(format!("Failed to write to {}", dest.display()), e))?;
        progress.advance(chunk.len());
    }

    file.flush()
        .await
        .map_err(|e| GozError::io(format!("Failed to flush {}", dest.display()), e))?;

    progress.finish();

    Ok(())
}

/// Download progress, redrawn in place on one stderr line.
struct Progress {
    total: Option<u64>,
    received: u64,
    last_draw: Instant,
}

impl Progress {
    fn new(total: Option<u64>) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            received: 0,
            last_draw: Instant::now(),
        }
    }

    fn advance(&mut self, bytes: usize) {
        self.received += bytes as u64;
        if self.last_draw.elapsed() >= PROGRESS_INTERVAL {
            self.draw();
            self.last_draw = Instant::now();
        }
    }

    fn finish(&self) {
        self.draw();
        eprintln!();
    }

    fn draw(&self) {
        eprint!("\rgoz: {}   ", self.line());
        let _ = std::io::stderr().flush();
    }

    /// `3.0 MiB of 12.0 MiB (25%)`, or `3.0 MiB` when the size is unknown.
    fn line(&self) -> String {
        match self.total {
            Some(total) => {
                let percent = (self.received.saturating_mul(100) / total).min(100);
                format!("{} of {} ({percent}%)", mib(self.received), mib(total))
            }
            None => mib(self.received),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mib(bytes: u64) -> String {
    format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
}
