//! Zeplin REST API client.
//!
//! The pipeline consumes the API through the [`ProjectApi`] trait so that
//! the reconciliation and pagination logic can run against a mock in
//! tests. The concrete [`ZeplinClient`] authenticates with a personal
//! access token and retries rate-limited or failing requests with
//! exponential backoff — Zeplin allows 200 requests per user per minute.

pub mod error;
pub mod models;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::retry::{retry_with_backoff, RetryAction, RetryConfig};
use error::ApiError;
use models::{Project, Screen, ScreenVersion};

pub const DEFAULT_BASE_URL: &str = "https://api.zeplin.dev/v1";

/// Fetch adapters consumed by the sync pipeline.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError>;

    async fn list_screens(
        &self,
        project_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Screen>, ApiError>;

    async fn get_screen_version(
        &self,
        project_id: &str,
        screen_id: &str,
    ) -> Result<ScreenVersion, ApiError>;
}

pub struct ZeplinClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    retry: RetryConfig,
}

impl ZeplinClient {
    pub fn new(token: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), token)
    }

    pub fn with_base_url(base_url: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            retry: RetryConfig::default(),
        }
    }

    /// Plain client for CDN asset fetches — asset URLs are pre-signed and
    /// must not carry the API token.
    pub fn download_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        retry_with_backoff(
            &self.retry,
            |e: &ApiError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || async {
                let response = self
                    .http
                    .get(&url)
                    .bearer_auth(&self.token)
                    .send()
                    .await
                    .map_err(|e| ApiError::Transport {
                        source: e,
                        url: url.clone(),
                    })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ApiError::Status {
                        status: status.as_u16(),
                        url: url.clone(),
                    });
                }

                response.json::<T>().await.map_err(|e| ApiError::Decode {
                    source: e,
                    url: url.clone(),
                })
            },
        )
        .await
    }
}

impl std::fmt::Debug for ZeplinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZeplinClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProjectApi for ZeplinClient {
    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.get_json(format!("{}/projects/{}", self.base_url, project_id))
            .await
    }

    async fn list_screens(
        &self,
        project_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Screen>, ApiError> {
        self.get_json(format!(
            "{}/projects/{}/screens?offset={}&limit={}",
            self.base_url, project_id, offset, limit
        ))
        .await
    }

    async fn get_screen_version(
        &self,
        project_id: &str,
        screen_id: &str,
    ) -> Result<ScreenVersion, ApiError> {
        self.get_json(format!(
            "{}/projects/{}/screens/{}/versions/latest",
            self.base_url, project_id, screen_id
        ))
        .await
    }
}
