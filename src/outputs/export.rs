//! Export of a generated post.
//!
//! Plain text and Markdown are written exactly as generated; the model already
//! produces Markdown-flavored text. HTML wraps the content in a minimal page
//! and turns every line break into `<br>`. The content is not escaped.

use crate::error::Error;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    #[value(name = "txt")]
    Text,
    #[value(name = "md")]
    Markdown,
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }

    /// Guess the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(ExportFormat::Text),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            "html" | "htm" => Some(ExportFormat::Html),
            _ => None,
        }
    }

    pub fn render(self, content: &str) -> String {
        match self {
            ExportFormat::Text | ExportFormat::Markdown => content.to_string(),
            ExportFormat::Html => format!(
                "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n    <title>Blog Post</title>\n</head>\n<body>\n{}\n</body>\n</html>",
                content.replace('\n', "<br>\n")
            ),
        }
    }
}

/// Append the format's extension unless the path already ends with it.
pub fn ensure_extension(path: &Path, format: ExportFormat) -> PathBuf {
    let has_it = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(format.extension()));
    if has_it {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Render `content` and write it, returning the path actually written.
#[instrument(level = "info", skip(content), fields(path = %path.display()))]
pub async fn export(content: &str, format: ExportFormat, path: &Path) -> Result<PathBuf, Error> {
    if content.trim().is_empty() {
        return Err(Error::validation("there is no generated post to save"));
    }
    let path = ensure_extension(path, format);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, format.render(content)).await?;
    info!(path = %path.display(), ?format, "Exported post");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_render_converts_every_break() {
        let html = ExportFormat::Html.render("Title\n\nBody");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains("<body>\nTitle<br>\n<br>\nBody\n</body>"));
    }

    #[test]
    fn test_plain_render_is_untouched() {
        let content = "# Title\n\n  *body* <b>\n";
        assert_eq!(ExportFormat::Text.render(content), content);
        assert_eq!(ExportFormat::Markdown.render(content), content);
    }

    #[test]
    fn test_ensure_extension() {
        assert_eq!(
            ensure_extension(Path::new("out/post"), ExportFormat::Html),
            PathBuf::from("out/post.html")
        );
        assert_eq!(
            ensure_extension(Path::new("post.MD"), ExportFormat::Markdown),
            PathBuf::from("post.MD")
        );
        assert_eq!(
            ensure_extension(Path::new("post.md"), ExportFormat::Text),
            PathBuf::from("post.md.txt")
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a.htm")), Some(ExportFormat::Html));
        assert_eq!(ExportFormat::from_path(Path::new("a.md")), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::from_path(Path::new("a")), None);
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let written = export("line one\nline two", ExportFormat::Html, &dir.path().join("nested/post"))
            .await
            .unwrap();
        assert_eq!(written, dir.path().join("nested/post.html"));
        let body = std::fs::read_to_string(&written).unwrap();
        assert!(body.contains("line one<br>\nline two"));
    }

    #[tokio::test]
    async fn test_export_rejects_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("post.txt");
        let err = export("  \n", ExportFormat::Text, &path).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!path.exists());
    }
}
