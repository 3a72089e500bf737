use crate::error::{CardError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Configuration for the HTTP client
#[derive(Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_content_length: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "thread-card/0.1".to_string(),
            timeout_secs: 10,
            max_content_length: 10 * 1024 * 1024, // 10MB
            max_redirects: 10,
        }
    }
}

/// Anything that can hand back the raw bytes of a thread page
pub trait Upstream: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchResponse>> + Send;
}

/// HTTP client wrapper for the board service
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a new Fetcher with the given configuration
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| CardError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn transport_error(url: &Url, reason: impl Into<String>) -> CardError {
        CardError::UpstreamTransport {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Read response body with size limit
    async fn read_body_limited(&self, url: &Url, response: reqwest::Response) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| Self::transport_error(url, format!("Read error: {}", e)))?;
            bytes.extend_from_slice(&chunk);

            if bytes.len() > self.config.max_content_length {
                return Err(Self::transport_error(
                    url,
                    format!("Content exceeds {} byte limit", self.config.max_content_length),
                ));
            }
        }

        Ok(bytes)
    }
}

impl Upstream for Fetcher {
    /// GET the page once and keep the body as undecoded bytes
    async fn fetch(&self, url: &Url) -> Result<FetchResponse> {
        tracing::debug!(%url, "fetching thread page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Self::transport_error(
                        url,
                        format!("Request timed out after {} seconds", self.config.timeout_secs),
                    )
                } else {
                    Self::transport_error(url, e.to_string())
                }
            })?;

        // Check content length before reading body
        if let Some(content_length) = response.content_length()
            && content_length as usize > self.config.max_content_length
        {
            return Err(Self::transport_error(
                url,
                format!("Content exceeds {} byte limit", self.config.max_content_length),
            ));
        }

        // Error pages are still HTML worth handing to the extractor
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "upstream returned non-success status");
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = self.read_body_limited(url, response).await?;

        Ok(FetchResponse {
            status: status.as_u16(),
            content_type,
            body,
            final_url,
        })
    }
}

/// Response from a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub final_url: Url,
}

impl FetchResponse {
    /// The `charset` parameter of the Content-Type header, if any
    pub fn charset(&self) -> Option<&str> {
        self.content_type.as_deref()?.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
    }
}
