//! Fallback scraper for any other blog or article page.
//!
//! Tries the usual content landmarks in priority order and takes the first
//! one holding a real amount of text. When none qualifies, every paragraph
//! on the page is stitched together instead.

use crate::error::ExtractError;
use crate::models::ExtractedPost;
use crate::scrapers::page::PageSource;
use crate::scrapers::{ExtractSettings, SiteVariant};
use tracing::{debug, info, instrument};

pub const LANDMARKS: &str = "article, main, .post-content, .entry-content";
pub const CANDIDATES: [&str; 6] = [
    "article",
    "main",
    ".post-content",
    ".entry-content",
    ".content",
    r#"[role="main"]"#,
];
pub const PARAGRAPHS: &str = "p";

#[instrument(level = "info", skip_all, fields(url = %page.url()))]
pub async fn extract<P: PageSource>(
    page: &P,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    // pages without landmarks can still yield paragraphs
    if let Err(e) = page.wait_for(LANDMARKS, settings.selector_timeout).await {
        debug!(error = %e, "No landmark appeared; trying candidates anyway");
    }

    for selector in CANDIDATES {
        match page.inner_text(selector).await {
            Ok(Some(text)) => {
                let chars = text.chars().count();
                if chars > settings.min_content_chars {
                    info!(selector, chars, "Content container found");
                    return Ok(post(text));
                }
                debug!(selector, chars, "Container too short; trying next");
            }
            Ok(None) => debug!(selector, "No match"),
            Err(e) => debug!(selector, error = %e, "Lookup failed; trying next"),
        }
    }

    let paragraphs: Vec<String> = page
        .inner_texts(PARAGRAPHS)
        .await?
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();
    if paragraphs.is_empty() {
        return Err(ExtractError::NoContent {
            variant: SiteVariant::Generic,
        });
    }
    info!(count = paragraphs.len(), "Falling back to paragraph text");
    Ok(post(paragraphs.join("\n\n")))
}

fn post(body: String) -> ExtractedPost {
    ExtractedPost {
        variant: SiteVariant::Generic,
        title: None,
        body,
    }
}
