/// Raw watch page retrieval
use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Result, TranscriptError};
use crate::retry::RetryExecutor;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, COOKIE, DNT, PRAGMA, UPGRADE_INSECURE_REQUESTS};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Source of raw watch page markup
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, video_id: &str, restricted: bool) -> Result<String>;
}

/// Fetches the watch page over HTTP with visibility-dependent headers
#[derive(Clone)]
pub struct HostPageFetcher {
    client: Client,
    watch_url: String,
    retry: RetryExecutor,
}

impl HostPageFetcher {
    /// Create a fetcher from the fetch and retry sections of the configuration
    pub fn new(fetch: &FetchConfig, retry: &RetryConfig) -> Self {
        // No cookie store: every request goes out without session state
        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.request_timeout_seconds))
            .user_agent(fetch.user_agent.as_str())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, fetch.watch_url.clone(), retry)
    }

    pub fn with_client(client: Client, watch_url: impl Into<String>, retry: &RetryConfig) -> Self {
        Self {
            client,
            watch_url: watch_url.into(),
            retry: RetryExecutor::from_config("fetch_page", retry.page_attempts, retry),
        }
    }

    /// Watch URL for a video id
    pub fn page_url(&self, video_id: &str) -> String {
        let separator = if self.watch_url.contains('?') { '&' } else { '?' };
        format!("{}{}v={}", self.watch_url, separator, video_id)
    }

    async fn fetch_once(&self, url: &str, restricted: bool) -> Result<String> {
        let response = self
            .client
            .get(url)
            .headers(request_headers(restricted))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(TranscriptError::EmptyResponse(url.to_string()));
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

#[async_trait]
impl PageSource for HostPageFetcher {
    async fn fetch_page(&self, video_id: &str, restricted: bool) -> Result<String> {
        let url = self.page_url(video_id);
        info!("🌐 Fetching watch page: {} (restricted: {})", url, restricted);

        self.retry.run(|| self.fetch_once(&url, restricted)).await
    }
}

/// Request headers for the given visibility state
pub fn request_headers(restricted: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if restricted {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    } else {
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(COOKIE, HeaderValue::from_static(""));
    }
    headers
}
