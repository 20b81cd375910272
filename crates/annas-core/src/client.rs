//! HTTP client for Anna's Archive
//!
//! Thin wrapper around `reqwest` that applies timeouts and headers and
//! maps HTTP failures onto [`AnnasError`]. The client itself never retries;
//! retry policy belongs to the callers that need it.

use std::time::Duration;

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{AnnasError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout for page and API requests in seconds (default: 30)
    pub timeout_secs: u64,
    /// Timeout for a whole file download in seconds (default: 300)
    pub download_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            download_timeout_secs: 300,
        }
    }
}

/// A fetched HTML page together with the URL it was finally served from
#[derive(Debug, Clone)]
pub struct Page {
    pub body: String,
    pub url: Url,
}

/// HTTP client wrapper used by every network component
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AnnasClient {
    client: reqwest::Client,
    download_timeout: Duration,
}

impl AnnasClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(AnnasError::HttpError)?;

        Ok(Self {
            client,
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        })
    }

    /// Fetch an HTML page
    ///
    /// Redirects are followed; the returned [`Page::url`] is the final URL
    /// and serves as the base for resolving relative links.
    ///
    /// # Errors
    /// - `HttpError` - Network errors
    /// - `RateLimited` - Server returned 429
    /// - `NotFound` - Server returned 404
    /// - `BadStatus` - Any other non-success status
    pub async fn fetch_page(&self, url: &str) -> Result<Page> {
        debug!(url, "fetching page");
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response)?;

        let final_url = response.url().clone();
        let body = response.text().await?;
        debug!(url = %final_url, bytes = body.len(), "page fetched");

        Ok(Page {
            body,
            url: final_url,
        })
    }

    /// Fetch and decode a JSON document
    ///
    /// The body is decoded whatever the status code, because APIs such as
    /// the fast download endpoint report errors as JSON with a 4xx status.
    ///
    /// # Errors
    /// - `HttpError` - Network errors
    /// - `BadStatus` - Non-success status with a body that is not the expected JSON
    /// - `DecodeError` - Success status with a body that is not the expected JSON
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                AnnasError::DecodeError(e.to_string())
            } else {
                AnnasError::BadStatus {
                    status: status.as_u16(),
                    url: final_url,
                }
            }
        })
    }

    /// Start a file download and return the response for streaming
    ///
    /// Uses the longer download timeout instead of the page timeout.
    ///
    /// # Errors
    /// - `HttpError` - Network errors
    /// - `DownloadFailed` - Any non-success status
    pub async fn start_download(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnnasError::DownloadFailed {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    /// Underlying `reqwest` client, shared with API integrations
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnnasError::RateLimited);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AnnasError::NotFound(response.url().to_string()));
        }

        if !status.is_success() {
            return Err(AnnasError::BadStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response)
    }
}
