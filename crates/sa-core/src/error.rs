//! Error types for sa-core

use thiserror::Error;

/// Main error type for sa-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Gemini API error: {0}")]
    GeminiApi(String),

    #[error("Gemini returned no usable text")]
    EmptyResponse,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model output is not valid JSON: {0}")]
    ModelOutput(String),

    #[error("Assessment plan does not name a target role")]
    MissingRole,

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sa-core
pub type Result<T> = std::result::Result<T, Error>;
