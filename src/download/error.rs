use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Http { source: reqwest::Error, url: String },

    #[error("could not write {path}: {source}")]
    Disk {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl DownloadError {
    /// One-line detail for the activity log.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}
