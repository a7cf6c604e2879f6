//! Project persistence.
//!
//! [`ProjectStore`] is insert-only from the pipeline's point of view, plus a
//! recent-history read. [`SupabaseStore`] implements it over Supabase's
//! PostgREST interface.

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::models::{NewProjectRecord, ProjectRecord, id_to_string};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use tracing::{info, instrument};

pub trait ProjectStore {
    /// Write one record; returns the id the store assigned, if it sent one back.
    fn insert(
        &self,
        record: &NewProjectRecord,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Most recent records first.
    fn recent(&self, limit: usize)
    -> impl Future<Output = Result<Vec<ProjectRecord>, StoreError>> + Send;
}

#[derive(Clone)]
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: serde_json::Value,
}

impl SupabaseStore {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        config: &AppConfig,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: config.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn insert_request(&self, record: &NewProjectRecord) -> reqwest::RequestBuilder {
        self.request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(record)
    }

    /// Newest rows first, `limit` of them.
    fn recent_request(&self, limit: usize) -> reqwest::RequestBuilder {
        let limit = limit.to_string();
        self.request(reqwest::Method::GET).query(&[
            ("select", "*"),
            ("order", "created_at.desc"),
            ("limit", limit.as_str()),
        ])
    }
}

async fn check(response: reqwest::Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(StoreError::Api {
            status: status.as_u16(),
            message: body,
        })
    }
}

/// First row's id from a `return=representation` insert response.
fn first_id(body: &str) -> Option<String> {
    serde_json::from_str::<Vec<InsertedRow>>(body)
        .ok()?
        .into_iter()
        .next()
        .map(|row| id_to_string(&row.id))
}

impl ProjectStore for SupabaseStore {
    #[instrument(level = "info", skip_all, fields(table = %self.table))]
    async fn insert(&self, record: &NewProjectRecord) -> Result<Option<String>, StoreError> {
        let response = self.insert_request(record).send().await?;
        let body = check(response).await?;
        let id = first_id(&body);
        info!(id = ?id, "Project saved");
        Ok(id)
    }

    #[instrument(level = "info", skip(self), fields(table = %self.table))]
    async fn recent(&self, limit: usize) -> Result<Vec<ProjectRecord>, StoreError> {
        let response = self.recent_request(limit).send().await?;
        let body = check(response).await?;
        let records: Vec<ProjectRecord> =
            serde_json::from_str(&body).map_err(|e| StoreError::Api {
                status: 200,
                message: format!("unreadable rows: {e}"),
            })?;
        info!(count = records.len(), "Loaded project history");
        Ok(records)
    }
}
