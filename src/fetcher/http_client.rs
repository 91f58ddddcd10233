use crate::config::FetcherConfig;
use crate::error::FetchError;
use anyhow::{Context, Result};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

use super::Page;

/// Shared HTTP client. One per run; the cookie store is shared by every school.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).context("Invalid Accept-Language value")?,
        );

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { inner })
    }

    /// Single GET; non-2xx is an error. No retries.
    pub async fn get(&self, url: &str, extra: &[(String, String)]) -> Result<Page, FetchError> {
        debug!("GET {}", url);

        let mut req = self.inner.get(url);
        for (k, v) in extra {
            match (HeaderName::try_from(k.as_str()), HeaderValue::from_str(v)) {
                (Ok(name), Ok(value)) => req = req.header(name, value),
                _ => warn!("Skipping invalid header {}: {}", k, v),
            }
        }

        let resp = req.send().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = resp.text().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(Page { url: url.to_string(), status: status.as_u16(), body })
    }
}
