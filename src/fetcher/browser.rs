use crate::config::BrowserConfig;
use crate::error::FetchError;
use std::time::Duration;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::Page;

const CHROME_ARGS: [&str; 4] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
];

/// Lazily started WebDriver session. Callers are serialized by the mutex;
/// `close` quits the browser and leaves the engine ready to start again.
pub struct BrowserEngine {
    config: BrowserConfig,
    driver: Mutex<Option<WebDriver>>,
}

impl BrowserEngine {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config, driver: Mutex::new(None) }
    }

    async fn start(&self) -> Result<WebDriver, FetchError> {
        let mut caps = DesiredCapabilities::chrome();
        if self.config.headless {
            caps.set_headless().map_err(|e| FetchError::BrowserStart(e.to_string()))?;
        }
        for arg in CHROME_ARGS {
            caps.add_arg(arg).map_err(|e| FetchError::BrowserStart(e.to_string()))?;
        }

        info!("Starting browser session at {}", self.config.webdriver_url);
        WebDriver::new(&self.config.webdriver_url, caps)
            .await
            .map_err(|e| FetchError::BrowserStart(e.to_string()))
    }

    /// Load `url`, wait up to `wait_ms` for `wait_for` to match, return the
    /// page source. A selector that never appears only logs a warning.
    pub async fn render(&self, url: &str, wait_for: Option<&str>, wait_ms: Option<u64>) -> Result<Page, FetchError> {
        if !self.config.enabled {
            return Err(FetchError::RenderDisabled);
        }

        let mut guard = self.driver.lock().await;
        if guard.is_none() {
            let driver = self.start().await?;
            *guard = Some(driver);
        }
        let driver = guard
            .as_ref()
            .ok_or_else(|| FetchError::BrowserStart("session unavailable".into()))?;

        let render_err = |e: thirtyfour::error::WebDriverError| FetchError::Render {
            url: url.to_string(),
            message: e.to_string(),
        };

        debug!("RENDER {}", url);
        driver.goto(url).await.map_err(render_err)?;

        if let Some(css) = wait_for {
            let budget = Duration::from_millis(wait_ms.unwrap_or(self.config.default_wait_ms));
            let poll = Duration::from_millis(self.config.poll_interval_ms.max(10));
            let deadline = Instant::now() + budget;

            loop {
                let found = driver.find_all(By::Css(css)).await.map(|v| !v.is_empty()).unwrap_or(false);
                if found {
                    break;
                }
                if Instant::now() >= deadline {
                    warn!("selector not found: `{}` on {} after {:?}", css, url, budget);
                    break;
                }
                sleep(poll).await;
            }
        }

        let body = driver.source().await.map_err(render_err)?;
        Ok(Page { url: url.to_string(), status: 200, body })
    }

    pub async fn close(&self) -> Result<(), FetchError> {
        let driver = self.driver.lock().await.take();
        match driver {
            Some(driver) => {
                debug!("Closing browser session");
                driver.quit().await.map_err(|e| FetchError::Render {
                    url: self.config.webdriver_url.clone(),
                    message: format!("quit failed: {}", e),
                })
            }
            None => Ok(()),
        }
    }
}
