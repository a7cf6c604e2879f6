//! Headless Chromium fetcher built on `chromiumoxide`.
//!
//! [`BrowserSession`] owns the browser process and the CDP handler task;
//! [`BrowserPage`] is one tab implementing [`PageSource`]. Pages must be
//! closed explicitly since `chromiumoxide::Page` has no `Drop` cleanup.

use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::scrapers::page::PageSource;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Quiet period after the load event for script-rendered content.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Pump CDP messages until the connection closes.
///
/// Individual events can fail to deserialize on newer Chrome builds; those
/// errors are per message, so the loop keeps going and only ends when the
/// stream does.
async fn drive_handler<H, E>(mut handler: H)
where
    H: futures::Stream<Item = Result<(), E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(event) = handler.next().await {
        if let Err(e) = event {
            debug!(error = %e, "Skipping CDP event");
        }
    }
    debug!("CDP connection closed");
}

/// A running headless browser.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl BrowserSession {
    #[instrument(level = "info", skip_all)]
    pub async fn launch(config: &AppConfig) -> Result<Self, ExtractError> {
        let browser_config = BrowserConfig::builder()
            .arg(format!("--user-agent={}", config.user_agent))
            .request_timeout(config.navigation_timeout())
            .build()
            .map_err(ExtractError::Navigation)?;
        let (browser, handler) = Browser::launch(browser_config).await?;
        let handler = tokio::spawn(drive_handler(handler));
        info!("Headless browser launched");
        Ok(Self {
            browser,
            handler,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    /// Open `url` in a new tab and wait for the load to settle.
    #[instrument(level = "info", skip(self))]
    pub async fn open(&self, url: &str) -> Result<BrowserPage, ExtractError> {
        let page = self.browser.new_page("about:blank").await?;
        let t0 = Instant::now();
        match timeout(self.navigation_timeout, navigate(&page, url)).await {
            Ok(Ok(())) => {
                info!(elapsed_ms = t0.elapsed().as_millis(), "Page loaded");
                Ok(BrowserPage {
                    page,
                    url: url.to_string(),
                    navigation_timeout: self.navigation_timeout,
                })
            }
            Ok(Err(e)) => {
                close_quietly(page).await;
                Err(e)
            }
            Err(_) => {
                close_quietly(page).await;
                Err(ExtractError::Navigation(format!(
                    "{} did not load within {} s",
                    url,
                    self.navigation_timeout.as_secs()
                )))
            }
        }
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to reap browser process");
        }
        self.handler.abort();
    }
}

/// Load `url` and wait for it to settle.
///
/// `wait_for_navigation` resolves on the load event, not on network idle,
/// which chromiumoxide does not expose. A short fixed quiet period follows;
/// the selector polling in [`PageSource::wait_for`] covers anything slower.
async fn navigate(page: &Page, url: &str) -> Result<(), ExtractError> {
    page.goto(url).await?;
    page.wait_for_navigation().await?;
    sleep(SETTLE_DELAY).await;
    Ok(())
}

async fn close_quietly(page: Page) {
    if let Err(e) = page.close().await {
        warn!(error = %e, "Failed to close tab");
    }
}

/// One browser tab.
pub struct BrowserPage {
    page: Page,
    url: String,
    navigation_timeout: Duration,
}

impl BrowserPage {
    pub async fn close(self) {
        close_quietly(self.page).await;
    }
}

impl PageSource for BrowserPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for(&self, selector: &str, wait: Duration) -> Result<(), ExtractError> {
        let t0 = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                debug!(selector, elapsed_ms = t0.elapsed().as_millis(), "Selector appeared");
                return Ok(());
            }
            if t0.elapsed() >= wait {
                return Err(ExtractError::Timeout {
                    selector: selector.to_string(),
                    waited_ms: t0.elapsed().as_millis(),
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>, ExtractError> {
        // CDP reports "no node" as an error; treat it as no match
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(None);
        };
        Ok(element.inner_text().await?)
    }

    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>, ExtractError> {
        let elements = self.page.find_elements(selector).await.unwrap_or_default();
        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(text) = element.inner_text().await? {
                texts.push(text);
            }
        }
        Ok(texts)
    }

    /// Navigates this tab into the frame's document; the outer page is not
    /// needed afterwards.
    async fn content_frame(&self, selector: &str) -> Result<Option<Self>, ExtractError> {
        let Ok(frame) = self.page.find_element(selector).await else {
            return Ok(None);
        };
        let Some(src) = frame.attribute("src").await? else {
            return Ok(None);
        };
        let frame_url = Url::parse(&self.url)
            .and_then(|base| base.join(&src))
            .map(|u| u.to_string())
            .unwrap_or(src);
        info!(%frame_url, "Following content frame");
        match timeout(self.navigation_timeout, navigate(&self.page, &frame_url)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ExtractError::Navigation(format!(
                    "frame {} did not load within {} s",
                    frame_url,
                    self.navigation_timeout.as_secs()
                )));
            }
        }
        Ok(Some(Self {
            page: self.page.clone(),
            url: frame_url,
            navigation_timeout: self.navigation_timeout,
        }))
    }
}
