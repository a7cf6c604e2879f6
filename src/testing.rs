//! Test doubles for the model and the store.

use crate::api::AskAsync;
use crate::error::{LlmError, StoreError};
use crate::models::{NewProjectRecord, ProjectRecord};
use crate::storage::ProjectStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Model that replies with a canned answer and remembers every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    reply: Option<String>,
    failure: Option<String>,
    gate: Option<Arc<Notify>>,
    pub prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Hold every reply until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl AskAsync for ScriptedModel {
    async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match (&self.reply, &self.failure) {
            (_, Some(message)) => Err(LlmError::Api {
                status: 500,
                message: message.clone(),
            }),
            (Some(reply), None) => Ok(reply.clone()),
            (None, None) => Err(LlmError::EmptyResponse),
        }
    }
}

/// Store that keeps rows in memory, or rejects every insert.
#[derive(Default)]
pub struct MemoryStore {
    pub rows: Mutex<Vec<NewProjectRecord>>,
    fail: bool,
    inserts: AtomicUsize,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

impl ProjectStore for MemoryStore {
    async fn insert(&self, record: &NewProjectRecord) -> Result<Option<String>, StoreError> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(StoreError::Api {
                status: 401,
                message: "invalid api key".to_string(),
            });
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(Some(n.to_string()))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ProjectRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .enumerate()
            .rev()
            .take(limit)
            .map(|(i, r)| ProjectRecord {
                id: serde_json::json!(i + 1),
                created_at: None,
                reference_text: r.reference_text.clone(),
                reference_url: r.reference_url.clone(),
                analysis_result: r.analysis_result.clone(),
                topic: r.topic.clone(),
                keywords: r.keywords.clone(),
                requirements: r.requirements.clone(),
                generated_content: r.generated_content.clone(),
                status: r.status.to_string(),
            })
            .collect())
    }
}
