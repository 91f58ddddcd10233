pub mod browser;
pub mod http_client;
#[cfg(test)]
pub mod testing;

use crate::config::{BrowserConfig, FetcherConfig};
use crate::error::FetchError;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use self::browser::BrowserEngine;
use self::http_client::HttpClient;

// ── Page + options ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn into_body(self) -> String {
        debug!("{} -> HTTP {} ({} bytes)", self.url, self.status, self.body.len());
        self.body
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Load through the browser so client-side rendering runs.
    pub render: bool,
    pub wait_for_selector: Option<String>,
    pub wait_time_ms: Option<u64>,
    pub headers: Vec<(String, String)>,
}

impl FetchOptions {
    pub fn rendered(wait_for: &str, wait_ms: u64) -> Self {
        Self {
            render: true,
            wait_for_selector: Some(wait_for.to_string()),
            wait_time_ms: Some(wait_ms),
            ..Self::default()
        }
    }
}

// ── Fetcher trait ─────────────────────────────────────────────────────────────

/// Page source for one unit of work.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<Page, FetchError>;

    /// Release whatever the session holds. Called once per unit of work.
    async fn close(&self) -> Result<(), FetchError>;

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.fetch(url, &FetchOptions::default()).await?.into_body())
    }

    async fn render(&self, url: &str, wait_for: &str, wait_ms: u64) -> Result<String, FetchError> {
        Ok(self.fetch(url, &FetchOptions::rendered(wait_for, wait_ms)).await?.into_body())
    }
}

/// Opens a fresh session per school.
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Box<dyn PageFetcher>;
}

// ── Live session ──────────────────────────────────────────────────────────────

/// HTTP client shared across schools plus a browser owned by this session.
pub struct SchoolSession {
    http: HttpClient,
    browser: BrowserEngine,
}

#[async_trait]
impl PageFetcher for SchoolSession {
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<Page, FetchError> {
        if opts.render {
            self.browser
                .render(url, opts.wait_for_selector.as_deref(), opts.wait_time_ms)
                .await
        } else {
            self.http.get(url, &opts.headers).await
        }
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.browser.close().await
    }
}

pub struct LiveSessions {
    http: HttpClient,
    browser: BrowserConfig,
}

impl LiveSessions {
    pub fn new(fetcher: &FetcherConfig, browser: &BrowserConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(fetcher)?,
            browser: browser.clone(),
        })
    }
}

impl SessionFactory for LiveSessions {
    fn open(&self) -> Box<dyn PageFetcher> {
        Box::new(SchoolSession {
            http: self.http.clone(),
            browser: BrowserEngine::new(self.browser.clone()),
        })
    }
}
