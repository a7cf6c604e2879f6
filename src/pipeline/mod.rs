//! The two model-backed stages: style analysis and composition.
//!
//! Both stages validate their inputs before talking to the model, send one
//! prompt, and return the response verbatim. [`generate_and_record`] adds the
//! single persistence write that follows a successful composition.

pub mod prompts;

use crate::api::AskAsync;
use crate::error::Error;
use crate::models::{Draft, GeneratedArticle, GenerationRequest, NewProjectRecord};
use crate::storage::ProjectStore;
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument, warn};

/// Ask the model to describe the structure and voice of `reference`.
#[instrument(level = "info", skip_all, fields(reference_chars = reference.chars().count()))]
pub async fn analyze<L: AskAsync>(llm: &L, reference: &str) -> Result<String, Error> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(Error::validation("enter or load a reference post first"));
    }
    let analysis = llm.ask(&prompts::analysis_prompt(reference)).await?;
    info!(preview = %truncate_for_log(&analysis, 120), "Analysis complete");
    Ok(analysis)
}

/// Checks on the request alone, so callers can reject it before loading or
/// analyzing a reference.
pub fn validate_request(request: &GenerationRequest) -> Result<(), Error> {
    if request.topic.trim().is_empty() {
        return Err(Error::validation("enter a topic for the new post"));
    }
    Ok(())
}

/// Checks that run before a composition request is sent.
pub fn validate_draft(draft: &Draft) -> Result<(), Error> {
    if draft.reference_text.trim().is_empty() {
        return Err(Error::validation("enter or load a reference post first"));
    }
    if draft.analysis.trim().is_empty() {
        return Err(Error::validation("analyze the reference post first"));
    }
    validate_request(&draft.request)
}

/// Write a new post following the analysis, on the requested topic.
#[instrument(level = "info", skip_all, fields(topic = %draft.request.topic))]
pub async fn compose<L: AskAsync>(llm: &L, draft: &Draft) -> Result<String, Error> {
    validate_draft(draft)?;
    let prompt = prompts::composition_prompt(&draft.analysis, &draft.request);
    let content = llm.ask(&prompt).await?;
    info!(chars = content.chars().count(), "Composition complete");
    Ok(content)
}

/// Compose, then record the project when a store is configured.
///
/// A failed insert is logged and otherwise ignored; the article is returned
/// either way.
pub async fn generate_and_record<L: AskAsync, S: ProjectStore>(
    llm: &L,
    store: Option<&S>,
    draft: &Draft,
) -> Result<GeneratedArticle, Error> {
    let content = compose(llm, draft).await?;
    let record_id = match store {
        Some(store) => {
            match store
                .insert(&NewProjectRecord::completed(draft, &content))
                .await
            {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Failed to save project; keeping generated text");
                    None
                }
            }
        }
        None => {
            debug!("No store configured; project not saved");
            None
        }
    };
    Ok(GeneratedArticle { content, record_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::testing::{MemoryStore, ScriptedModel};

    fn draft() -> Draft {
        Draft {
            reference_text: "How I fixed my sleep in 3 steps".to_string(),
            reference_url: Some("https://example.com/sleep".to_string()),
            analysis: "Numbered list, friendly tone".to_string(),
            request: GenerationRequest::from_fields("Winter skincare", "moisture, cream", ""),
        }
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_reference() {
        let model = ScriptedModel::replying("unused");
        let err = analyze(&model, "  \n ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_returns_response_verbatim() {
        let model = ScriptedModel::replying("  1. Title uses a question\n");
        let analysis = analyze(&model, "reference body").await.unwrap();
        assert_eq!(analysis, "  1. Title uses a question\n");
        assert_eq!(model.calls(), 1);
        assert!(model.last_prompt().unwrap().contains("reference body"));
    }

    #[tokio::test]
    async fn test_model_failure_is_generation_failure() {
        let model = ScriptedModel::failing("quota exceeded");
        let err = analyze(&model, "reference").await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Api { status: 500, .. })));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_compose_rejects_missing_inputs_without_calling() {
        let model = ScriptedModel::replying("unused");

        let mut no_analysis = draft();
        no_analysis.analysis = String::new();
        let mut no_topic = draft();
        no_topic.request.topic = " ".to_string();
        let mut no_reference = draft();
        no_reference.reference_text = String::new();

        for d in [no_analysis, no_topic, no_reference] {
            let err = compose(&model, &d).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_blank_topic_rejected_without_reference() {
        let err = validate_request(&GenerationRequest::from_fields("   ", "a, b", "")).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("topic")));
        assert!(validate_request(&GenerationRequest::from_fields("Winter skincare", "", "")).is_ok());
    }

    #[tokio::test]
    async fn test_compose_sends_analysis_and_request() {
        let model = ScriptedModel::replying("New post");
        assert_eq!(compose(&model, &draft()).await.unwrap(), "New post");
        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("Numbered list, friendly tone"));
        assert!(prompt.contains("- Topic: Winter skincare"));
    }

    #[tokio::test]
    async fn test_generation_inserts_once_with_store() {
        let model = ScriptedModel::replying("New post");
        let store = MemoryStore::default();
        let article = generate_and_record(&model, Some(&store), &draft()).await.unwrap();
        assert_eq!(article.content, "New post");
        assert_eq!(article.record_id.as_deref(), Some("1"));
        assert_eq!(store.inserts(), 1);

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows[0].generated_content, "New post");
        assert_eq!(rows[0].keywords, "moisture, cream");
        assert_eq!(rows[0].reference_url.as_deref(), Some("https://example.com/sleep"));
    }

    #[tokio::test]
    async fn test_generation_without_store_skips_insert() {
        let model = ScriptedModel::replying("New post");
        let article = generate_and_record::<_, MemoryStore>(&model, None, &draft())
            .await
            .unwrap();
        assert_eq!(article.record_id, None);
        assert_eq!(article.content, "New post");
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_article() {
        let model = ScriptedModel::replying("New post");
        let store = MemoryStore::failing();
        let article = generate_and_record(&model, Some(&store), &draft()).await.unwrap();
        assert_eq!(article.content, "New post");
        assert_eq!(article.record_id, None);
        assert_eq!(store.inserts(), 1);
    }

    #[tokio::test]
    async fn test_failed_generation_never_inserts() {
        let model = ScriptedModel::failing("boom");
        let store = MemoryStore::default();
        assert!(generate_and_record(&model, Some(&store), &draft()).await.is_err());
        assert_eq!(store.inserts(), 0);
    }
}
