//! Tistory scraper.
//!
//! Tistory skins disagree on markup, so the wait and the body lookup each
//! accept the three containers seen across the stock skins.

use crate::error::ExtractError;
use crate::models::ExtractedPost;
use crate::scrapers::page::PageSource;
use crate::scrapers::{ExtractSettings, SiteVariant, extract_titled};
use tracing::instrument;

pub const WAIT: &str = "article, .entry-content, .contents_style";
pub const CONTENT: &str = ".contents_style, .entry-content, article";
pub const TITLE: &str = "h1.tit_post, h2.title, .title_post";

#[instrument(level = "info", skip_all, fields(url = %page.url()))]
pub async fn extract<P: PageSource>(
    page: &P,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    extract_titled(page, SiteVariant::Tistory, WAIT, CONTENT, TITLE, settings).await
}
