use thiserror::Error;

/// Typed API errors enabling retry classification.
///
/// `is_retryable()` separates transient failures (rate limits, server
/// errors, connection drops) from permanent ones (4xx, malformed
/// responses) so the retry loop can abort early.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Transport { source: reqwest::Error, url: String },

    #[error("could not decode response from {url}: {source}")]
    Decode { source: reqwest::Error, url: String },
}

impl ApiError {
    /// Whether this error is transient and worth retrying.
    ///
    /// 429 is the API's rate limit (200 requests per minute) — backing
    /// off and retrying is the expected client behavior.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            ApiError::Transport { .. } => true,
            ApiError::Decode { .. } => false,
        }
    }
}
