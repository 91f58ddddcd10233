//! In-memory fetcher for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchOptions, Page, PageFetcher, SessionFactory};
use crate::error::FetchError;

#[derive(Clone, Default)]
pub struct StaticFetcher {
    pages: Arc<HashMap<String, String>>,
    status: Arc<HashMap<String, u16>>,
    delay: Option<Duration>,
    fail_close: bool,
    closes: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<(String, bool)>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), html.to_string());
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        Arc::make_mut(&mut self.status).insert(url.to_string(), status);
        self
    }

    pub fn delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// `(url, rendered)` for every fetch, in call order.
    pub fn requests(&self) -> Vec<(String, bool)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<Page, FetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push((url.to_string(), opts.render));
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if let Some(&status) = self.status.get(url) {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        match self.pages.get(url) {
            Some(body) => Ok(Page { url: url.to_string(), status: 200, body: body.clone() }),
            None => Err(FetchError::Status { url: url.to_string(), status: 404 }),
        }
    }

    async fn close(&self) -> Result<(), FetchError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(FetchError::BrowserStart("browser already gone".into()));
        }
        Ok(())
    }
}

impl SessionFactory for StaticFetcher {
    fn open(&self) -> Box<dyn PageFetcher> {
        Box::new(self.clone())
    }
}
