//! Error types shared by the extractors.

use thiserror::Error;

/// Extraction errors.
///
/// List extractors never surface these; they degrade to an empty result.
/// Only single-record parsers return them.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Empty input")]
    EmptyInput,

    #[error("No fields recovered from {0}")]
    NoFields(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern for {name}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid ward code: {0}")]
    InvalidWard(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
