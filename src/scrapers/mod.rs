//! Reference-post scrapers.
//!
//! A URL is classified by hostname into a [`SiteVariant`] and handed to the
//! matching submodule, each of which walks a short, ordered list of CSS
//! selectors:
//!
//! | Variant | Host contains | Module | Notes |
//! |---------|---------------|--------|-------|
//! | Naver Blog | `blog.naver.com` | [`naver`] | Body lives in the `mainFrame` iframe |
//! | Tistory | `tistory.com` | [`tistory`] | Three skin-dependent containers |
//! | Generic | anything else | [`generic`] | Landmark candidates, then all paragraphs |
//!
//! Pages are loaded by a headless browser ([`browser`]) or, with
//! [`Fetcher::Http`], downloaded and parsed statically ([`page::StaticPage`]).
//! Either way the variant scrapers only see the [`page::PageSource`] trait.

pub mod browser;
pub mod generic;
pub mod naver;
pub mod page;
pub mod tistory;

use crate::config::AppConfig;
use crate::error::{Error, ExtractError};
use crate::models::ExtractedPost;
use browser::BrowserSession;
use clap::ValueEnum;
use page::{PageSource, StaticPage};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use url::Url;

/// Site classification governing which selectors are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteVariant {
    NaverBlog,
    Tistory,
    Generic,
}

impl SiteVariant {
    /// Classify by substring match on the hostname. Unparseable input is
    /// matched as-is.
    pub fn classify(url: &str) -> Self {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_else(|| url.to_ascii_lowercase());
        if host.contains("blog.naver.com") {
            SiteVariant::NaverBlog
        } else if host.contains("tistory.com") {
            SiteVariant::Tistory
        } else {
            SiteVariant::Generic
        }
    }
}

impl fmt::Display for SiteVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SiteVariant::NaverBlog => "naver blog",
            SiteVariant::Tistory => "tistory",
            SiteVariant::Generic => "generic",
        };
        f.write_str(name)
    }
}

/// How pages are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Fetcher {
    /// Headless Chromium; runs page scripts.
    #[default]
    Browser,
    /// Plain HTTP GET; fast, but misses script-rendered content.
    Http,
}

/// Knobs shared by every variant scraper.
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub selector_timeout: Duration,
    pub min_content_chars: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExtractSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            selector_timeout: config.selector_timeout(),
            min_content_chars: config.min_content_chars,
        }
    }
}

/// Reject input that could never be loaded, before any work starts.
pub fn validate_url(url: &str) -> Result<String, Error> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::validation("enter a blog post URL"));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::validation(
            "not a valid URL (it must start with http:// or https://)",
        ));
    }
    Url::parse(url).map_err(|e| Error::validation(format!("not a valid URL: {e}")))?;
    Ok(url.to_string())
}

/// Shared shape of the platform scrapers: wait for the body container, read
/// an optional title, read the body.
pub(crate) async fn extract_titled<P: PageSource>(
    page: &P,
    variant: SiteVariant,
    wait: &str,
    content: &str,
    title: &str,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    page.wait_for(wait, settings.selector_timeout).await?;

    let title = match page.inner_text(title).await {
        Ok(t) => t.filter(|t| !t.trim().is_empty()),
        Err(e) => {
            debug!(error = %e, "Title lookup failed; continuing without");
            None
        }
    };

    match page.inner_text(content).await? {
        Some(body) if !body.trim().is_empty() => {
            info!(%variant, chars = body.chars().count(), has_title = title.is_some(), "Extracted post");
            Ok(ExtractedPost { variant, title, body })
        }
        _ => Err(ExtractError::NoContent { variant }),
    }
}

/// Dispatch an already-loaded page to its variant scraper.
pub async fn extract_page<P: PageSource>(
    page: &P,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    extract_variant(page, SiteVariant::classify(page.url()), settings).await
}

/// Load `url` with the chosen fetcher and extract the reference post.
///
/// The variant is decided from the URL the user gave, not wherever the
/// page redirected to.
#[instrument(level = "info", skip(config), fields(variant = %SiteVariant::classify(url)))]
pub async fn extract_url(
    url: &str,
    fetcher: Fetcher,
    config: &AppConfig,
) -> Result<ExtractedPost, Error> {
    let url = validate_url(url)?;
    let settings = ExtractSettings::from(config);
    let variant = SiteVariant::classify(&url);
    let t0 = Instant::now();

    let result = match fetcher {
        Fetcher::Browser => {
            let session = BrowserSession::launch(config).await?;
            let result = match session.open(&url).await {
                Ok(page) => {
                    let result = extract_variant(&page, variant, &settings).await;
                    page.close().await;
                    result
                }
                Err(e) => Err(e),
            };
            session.close().await;
            result
        }
        Fetcher::Http => {
            let client = reqwest::Client::builder()
                .user_agent(config.user_agent.as_str())
                .timeout(config.navigation_timeout())
                .build()
                .map_err(ExtractError::Fetch)?;
            let page = StaticPage::fetch(&client, &url).await?;
            extract_variant(&page, variant, &settings).await
        }
    };

    match &result {
        Ok(post) => info!(
            elapsed_ms = t0.elapsed().as_millis(),
            chars = post.body.chars().count(),
            "Extraction succeeded"
        ),
        Err(e) => error!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Extraction failed"),
    }
    result.map_err(Error::from)
}

async fn extract_variant<P: PageSource>(
    page: &P,
    variant: SiteVariant,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    match variant {
        SiteVariant::NaverBlog => naver::extract(page, settings).await,
        SiteVariant::Tistory => tistory::extract(page, settings).await,
        SiteVariant::Generic => generic::extract(page, settings).await,
    }
}
