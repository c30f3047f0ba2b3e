//! Error types for page sources and the clinic analyzer.

use hicd_extract_core::ConfigError;
use thiserror::Error;

/// Failures reported by a [`PageSource`](crate::PageSource).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Page not available: {0}")]
    Unavailable(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Source error: {0}")]
    Other(String),
}

/// Analyzer errors.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;
