//! Error types for every stage of the pipeline.
//!
//! Each external concern gets its own enum so callers can tell a selector
//! timeout from an API rejection. [`Error`] is what the foreground sees.

use crate::scrapers::SiteVariant;
use crate::worker::StageKind;
use thiserror::Error;

/// Failures raised while loading a page or pulling text out of it.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A required selector never matched within the wait.
    #[error("timed out after {waited_ms} ms waiting for `{selector}`")]
    Timeout { selector: String, waited_ms: u128 },
    /// Every candidate for the variant came up empty.
    #[error("no {variant} content found; copy the post text in manually")]
    NoContent { variant: SiteVariant },
    /// The page or its content frame did not load in time.
    #[error("navigation failed: {0}")]
    Navigation(String),
    /// A selector string that does not parse.
    #[error("invalid selector `{0}`")]
    Selector(String),
    #[error("browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    /// Plain HTTP fetcher errors, including non-2xx statuses.
    #[error("failed to fetch page: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Failures talking to the language-model endpoint.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model returned no text")]
    EmptyResponse,
}

/// Failures talking to the project store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("generation failed: {0}")]
    Llm(#[from] LlmError),
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),
    #[error("{0} is already running")]
    Busy(StageKind),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
