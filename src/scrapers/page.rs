//! The page abstraction the variant scrapers are written against.
//!
//! [`PageSource`] is the handful of lookups the selector chains need. Two
//! implementations exist: [`crate::scrapers::browser::BrowserPage`] drives a
//! live Chromium tab, [`StaticPage`] answers from downloaded HTML.

use crate::error::ExtractError;
use crate::utils::{collapse_inline_whitespace, normalize_block_text};
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Lookups a variant scraper performs against a loaded page.
///
/// Selectors may be comma-separated lists; a lookup resolves to the first
/// matching element in document order.
#[allow(async_fn_in_trait)]
pub trait PageSource: Sized {
    /// Address of the document currently loaded.
    fn url(&self) -> &str;

    /// Wait until `selector` matches, up to `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ExtractError>;

    /// Rendered text of the first element matching `selector`.
    async fn inner_text(&self, selector: &str) -> Result<Option<String>, ExtractError>;

    /// Rendered text of every element matching `selector`, in document order.
    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>, ExtractError>;

    /// Follow the first `iframe` matching `selector` into its document.
    async fn content_frame(&self, selector: &str) -> Result<Option<Self>, ExtractError>;
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dt", "dd", "figure",
    "figcaption", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "pre", "section", "table", "tr", "ul",
];

/// Approximate `HTMLElement.innerText` for a parsed element: inline
/// whitespace collapses, block elements start new lines, paragraphs are
/// separated by a blank line, `<br>` breaks, scripts and styles contribute
/// nothing.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    normalize_block_text(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Node::Text(text) = child.value() {
            out.push_str(&collapse_inline_whitespace(text));
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child.value().name();
        if SKIPPED_TAGS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }
        let breaks = match name {
            "p" => 2,
            _ if BLOCK_TAGS.contains(&name) => 1,
            _ => 0,
        };
        push_breaks(out, breaks);
        collect_text(child, out);
        push_breaks(out, breaks);
    }
}

/// Make sure `out` ends with at least `n` line breaks, dropping trailing spaces.
fn push_breaks(out: &mut String, n: usize) {
    if n == 0 {
        return;
    }
    while out.ends_with(' ') {
        out.pop();
    }
    let existing = out.chars().rev().take_while(|c| *c == '\n').count();
    for _ in existing..n {
        out.push('\n');
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|_| ExtractError::Selector(selector.to_string()))
}

/// A page answered from HTML fetched over plain HTTP (or handed in by a test).
///
/// The HTML is kept as text and parsed per lookup so the value stays
/// `Send + Sync` across awaits.
#[derive(Debug, Clone)]
pub struct StaticPage {
    url: String,
    html: String,
    /// Pre-fetched frame documents keyed by absolute URL.
    frames: HashMap<String, String>,
    client: Option<Client>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            frames: HashMap::new(),
            client: None,
        }
    }

    /// Register the document served for a frame at `url`.
    pub fn with_frame(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.frames.insert(url.into(), html.into());
        self
    }

    /// Download `url` and keep the client around for following frames.
    #[instrument(level = "info", skip(client), fields(%url))]
    pub async fn fetch(client: &Client, url: &str) -> Result<Self, ExtractError> {
        let response = client.get(url).send().await?.error_for_status()?;
        let final_url = response.url().to_string();
        let html = response.text().await?;
        info!(bytes = html.len(), %final_url, "Fetched page");
        let mut page = Self::new(final_url, html);
        page.client = Some(client.clone());
        Ok(page)
    }

    fn matches(&self, selector: &str) -> Result<bool, ExtractError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let found = document.select(&selector).next().is_some();
        Ok(found)
    }

    fn frame_url(&self, selector: &str) -> Result<Option<String>, ExtractError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let src = document
            .select(&selector)
            .find_map(|frame| frame.value().attr("src").map(str::to_string));
        let Some(src) = src else {
            return Ok(None);
        };
        let resolved = Url::parse(&self.url)
            .and_then(|base| base.join(&src))
            .map(|u| u.to_string())
            .unwrap_or(src);
        Ok(Some(resolved))
    }
}

impl PageSource for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), ExtractError> {
        // static HTML never changes, so the answer is immediate
        if self.matches(selector)? {
            Ok(())
        } else {
            Err(ExtractError::Timeout {
                selector: selector.to_string(),
                waited_ms: timeout.as_millis(),
            })
        }
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>, ExtractError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let text = document.select(&selector).next().map(element_text);
        Ok(text)
    }

    async fn inner_texts(&self, selector: &str) -> Result<Vec<String>, ExtractError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        let texts = document.select(&selector).map(element_text).collect();
        Ok(texts)
    }

    async fn content_frame(&self, selector: &str) -> Result<Option<Self>, ExtractError> {
        let Some(frame_url) = self.frame_url(selector)? else {
            return Ok(None);
        };
        if let Some(html) = self.frames.get(&frame_url) {
            debug!(%frame_url, "Using registered frame document");
            let mut frame = Self::new(frame_url, html.clone());
            frame.client = self.client.clone();
            return Ok(Some(frame));
        }
        match &self.client {
            Some(client) => Ok(Some(Self::fetch(client, &frame_url).await?)),
            None => {
                debug!(%frame_url, "Frame found but no client to load it");
                Ok(None)
            }
        }
    }
}
