//! Runtime configuration.
//!
//! Non-secret settings come from an optional YAML file; every field has a
//! default so the file may be partial or absent. Secrets never live here,
//! they arrive through the environment (see [`crate::cli::Cli`]).

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Desktop Chrome user agent sent by both fetchers.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Model identifier passed to `generateContent`.
    pub model: String,
    /// Base URL of the Gemini REST API.
    pub api_base: String,
    /// Table that receives one row per successful generation.
    pub table: String,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    /// A generic container must hold more than this many characters.
    pub min_content_chars: usize,
    pub history_limit: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            table: "blog_projects".to_string(),
            navigation_timeout_secs: 30,
            selector_timeout_secs: 10,
            min_content_chars: 100,
            history_limit: 20,
            request_timeout_secs: 120,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl AppConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn from_yaml(text: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load the YAML file at `path`, or the defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), model = %config.model, "Loaded configuration");
        Ok(config)
    }
}
