//! Data models that flow through the pipeline.
//!
//! - [`ExtractedPost`]: what the scrapers pull off a reference page
//! - [`GenerationRequest`]: topic, keywords and extra requirements for a new post
//! - [`Draft`]: everything the composer needs, snapshotted for a worker
//! - [`NewProjectRecord`] / [`ProjectRecord`]: the persisted row, outbound and inbound
//!
//! Field names of the record types match the `blog_projects` table columns.

use crate::scrapers::SiteVariant;
use crate::utils::{non_blank, split_keywords, truncate_for_log};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Text pulled out of a reference page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPost {
    /// Which selector family produced the text.
    pub variant: SiteVariant,
    pub title: Option<String>,
    pub body: String,
}

impl ExtractedPost {
    /// `title + blank line + body`, or the body alone.
    pub fn text(&self) -> String {
        match self.title.as_deref().and_then(non_blank) {
            Some(title) => format!("{}\n\n{}", title, self.body),
            None => self.body.clone(),
        }
    }
}

/// What the user wants written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub topic: String,
    /// Parsed, de-duplicated keywords for the prompt.
    pub keywords: Vec<String>,
    /// The keyword field as the user typed it, trimmed; this is what gets stored.
    pub keywords_text: String,
    pub requirements: Option<String>,
}

impl GenerationRequest {
    /// Build a request from raw form fields; keywords are comma-separated.
    pub fn from_fields(topic: &str, keywords: &str, requirements: &str) -> Self {
        Self {
            topic: topic.trim().to_string(),
            keywords: split_keywords(keywords),
            keywords_text: keywords.trim().to_string(),
            requirements: non_blank(requirements),
        }
    }

    /// Parsed keywords joined back into one comma-separated line.
    pub fn keywords_line(&self) -> String {
        self.keywords.join(", ")
    }
}

/// Inputs for one composition run.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub reference_text: String,
    pub reference_url: Option<String>,
    pub analysis: String,
    pub request: GenerationRequest,
}

/// Result of a composition run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArticle {
    pub content: String,
    /// Identifier the store assigned, when a row was written.
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Completed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Completed => f.write_str("completed"),
        }
    }
}

/// Row written once per successful generation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProjectRecord {
    pub reference_text: String,
    pub reference_url: Option<String>,
    pub analysis_result: String,
    pub topic: String,
    pub keywords: String,
    pub requirements: Option<String>,
    pub generated_content: String,
    pub status: ProjectStatus,
}

impl NewProjectRecord {
    pub fn completed(draft: &Draft, generated_content: &str) -> Self {
        Self {
            reference_text: draft.reference_text.clone(),
            reference_url: draft.reference_url.as_deref().and_then(non_blank),
            analysis_result: draft.analysis.clone(),
            topic: draft.request.topic.clone(),
            keywords: draft.request.keywords_text.clone(),
            requirements: draft.request.requirements.clone(),
            generated_content: generated_content.to_string(),
            status: ProjectStatus::Completed,
        }
    }
}

/// Row as read back from the store.
///
/// Other clients may write the same table, so every text column tolerates
/// `null` and `status` is kept as whatever string was stored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectRecord {
    /// Integer or UUID depending on how the table was created.
    pub id: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reference_text: String,
    #[serde(default)]
    pub reference_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub analysis_result: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keywords: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub generated_content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ProjectRecord {
    /// One line for history listings: id, creation time, topic, keywords.
    pub fn summary_line(&self) -> String {
        let when = self
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{:>8}  {:16}  {}  [{}]",
            id_to_string(&self.id),
            when,
            truncate_for_log(&self.topic, 40),
            self.keywords
        )
    }
}

/// Render a store-assigned id without JSON quoting.
pub fn id_to_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
