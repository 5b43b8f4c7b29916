//! Bounded-concurrency asset downloader.
//!
//! Downloads run through [`AssetFetcher`] so the batch driver can be
//! exercised against a mock. Up to [`DOWNLOAD_CONCURRENCY`] fetches are
//! in flight at once; completions are processed as they land, and only
//! the driver loop touches the metadata tree and the activity log, so
//! no locking is needed. A failed download is logged and skipped — it
//! never aborts the batch.

pub mod error;

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use crate::sync::log::ActivityLog;
use crate::sync::names::sanitize_path_component;
use crate::sync::tree::MetadataTree;
use error::DownloadError;

/// In-flight fetch cap, sized against the API's CDN rather than local
/// disk throughput.
pub const DOWNLOAD_CONCURRENCY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Exported asset variant; decoded after download to validate size.
    Asset,
    /// Rendered screen snapshot; written as-is, never decoded.
    Snapshot,
}

#[derive(Debug, Clone)]
pub struct DownloadTask {
    pub url: String,
    /// Raw screen name; sanitized only when building the disk path.
    pub screen_name: String,
    pub filename: String,
    pub kind: TaskKind,
}

/// Byte fetcher for pre-signed CDN URLs.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

#[async_trait]
impl AssetFetcher for reqwest::Client {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Http {
                source: e,
                url: url.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DownloadError::Http {
            source: e,
            url: url.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// What the post-download step learned about the written file.
enum DecodeOutcome {
    Size(u32, u32),
    Error(String),
    Skipped,
}

/// Run the batch with bounded concurrency. Returns `(downloaded, failed)`
/// counts; every task advances the progress bar exactly once, whichever
/// way it ends.
pub async fn run_batch(
    fetcher: &dyn AssetFetcher,
    tasks: Vec<DownloadTask>,
    output_root: &Path,
    tree: &mut MetadataTree,
    log: &mut ActivityLog,
    no_progress_bar: bool,
) -> (usize, usize) {
    let pb = create_progress_bar(tasks.len() as u64, no_progress_bar);

    let mut completions = stream::iter(tasks)
        .map(|task| async move {
            let outcome = fetch_one(fetcher, &task, output_root).await;
            (task, outcome)
        })
        .buffer_unordered(DOWNLOAD_CONCURRENCY);

    let mut downloaded = 0usize;
    let mut failed = 0usize;

    while let Some((task, outcome)) = completions.next().await {
        match outcome {
            Ok(DecodeOutcome::Size(width, height)) => {
                downloaded += 1;
                pb.suspend(|| {
                    tree.record_actual_size(&task.screen_name, &task.filename, width, height, log);
                });
            }
            Ok(DecodeOutcome::Error(detail)) => {
                // The file is on disk; only the validation step is lost.
                downloaded += 1;
                pb.suspend(|| {
                    log.error_with_detail(
                        Some(&task.screen_name),
                        format!("Error reading image {}", task.filename),
                        detail,
                    );
                });
            }
            Ok(DecodeOutcome::Skipped) => {
                downloaded += 1;
            }
            Err(e) => {
                failed += 1;
                pb.suspend(|| {
                    log.error_with_detail(
                        Some(&task.screen_name),
                        format!("Error downloading {}", task.filename),
                        e.detail(),
                    );
                });
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    (downloaded, failed)
}

async fn fetch_one(
    fetcher: &dyn AssetFetcher,
    task: &DownloadTask,
    output_root: &Path,
) -> Result<DecodeOutcome, DownloadError> {
    let bytes = fetcher.fetch_bytes(&task.url).await?;

    let dir = output_root.join(sanitize_path_component(&task.screen_name));
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| DownloadError::Disk {
            source: e,
            path: dir.clone(),
        })?;

    let path = dir.join(&task.filename);
    fs::write(&path, &bytes)
        .await
        .map_err(|e| DownloadError::Disk {
            source: e,
            path: path.clone(),
        })?;

    if task.kind != TaskKind::Asset {
        return Ok(DecodeOutcome::Skipped);
    }

    match image_dimensions(&bytes) {
        Ok((width, height)) => Ok(DecodeOutcome::Size(width, height)),
        Err(e) => Ok(DecodeOutcome::Error(e.to_string())),
    }
}

/// Decode just the header of an in-memory image to get its pixel size.
/// Formats the decoder does not understand (svg, pdf) error out here and
/// are reported as unreadable, not as failed downloads.
fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), image::ImageError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}

fn create_progress_bar(len: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
