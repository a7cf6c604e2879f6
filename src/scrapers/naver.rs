//! Naver Blog scraper.
//!
//! Post bodies on `blog.naver.com` live inside an iframe named `mainFrame`.
//! The scraper follows that frame when present and otherwise reads the top
//! document (mobile pages and some themes render inline). Both SmartEditor
//! ONE (`.se-main-container`) and the legacy editor (`#postViewArea`) are
//! recognized.

use crate::error::ExtractError;
use crate::models::ExtractedPost;
use crate::scrapers::page::PageSource;
use crate::scrapers::{ExtractSettings, SiteVariant, extract_titled};
use tracing::{debug, instrument};

pub const FRAME: &str = r#"iframe[name="mainFrame"], iframe[src*="mainFrame"]"#;
pub const CONTENT: &str = ".se-main-container, #postViewArea";
pub const TITLE: &str = ".se-title-text, .pcol1";

#[instrument(level = "info", skip_all, fields(url = %page.url()))]
pub async fn extract<P: PageSource>(
    page: &P,
    settings: &ExtractSettings,
) -> Result<ExtractedPost, ExtractError> {
    let frame = match page.content_frame(FRAME).await {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "Content frame lookup failed; reading top document");
            None
        }
    };

    match frame {
        Some(frame) => {
            extract_titled(&frame, SiteVariant::NaverBlog, CONTENT, CONTENT, TITLE, settings).await
        }
        None => {
            debug!("No content frame; reading top document");
            extract_titled(page, SiteVariant::NaverBlog, CONTENT, CONTENT, TITLE, settings).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::page::StaticPage;

    #[tokio::test]
    async fn test_follows_main_frame() {
        let page = StaticPage::new(
            "https://blog.naver.com/writer/2233",
            r#"<html><body><iframe id="mainFrame" name="mainFrame" src="/PostView.naver?blogId=writer&amp;logNo=2233"></iframe></body></html>"#,
        )
        .with_frame(
            "https://blog.naver.com/PostView.naver?blogId=writer&logNo=2233",
            r#"<div class="se-title-text">겨울철 피부 관리</div>
               <div class="se-main-container"><p>첫 문단입니다.</p><p>둘째 문단입니다.</p></div>"#,
        );
        let post = extract(&page, &ExtractSettings::default()).await.unwrap();
        assert_eq!(post.variant, SiteVariant::NaverBlog);
        assert_eq!(post.title.as_deref(), Some("겨울철 피부 관리"));
        assert_eq!(post.text(), "겨울철 피부 관리\n\n첫 문단입니다.\n\n둘째 문단입니다.");
    }

    #[tokio::test]
    async fn test_top_document_legacy_editor_without_title() {
        let page = StaticPage::new(
            "https://m.blog.naver.com/writer/2233",
            r#"<div id="postViewArea">legacy body</div>"#,
        );
        let post = extract(&page, &ExtractSettings::default()).await.unwrap();
        assert_eq!(post.title, None);
        assert_eq!(post.text(), "legacy body");
    }

    #[tokio::test]
    async fn test_missing_container_times_out() {
        let page = StaticPage::new("https://blog.naver.com/writer", "<p>profile page</p>");
        let err = extract(&page, &ExtractSettings::default()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Timeout { .. }));
    }
}
