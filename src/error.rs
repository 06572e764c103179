//! Errors raised while correcting queries.
use thiserror::Error;

/// Inconsistent inputs to the normalizer or the model builder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("the profile has no reference sequence")]
    EmptyProfile,
    #[error("profile row {id} has width {found}, expected {expected}")]
    RaggedProfile {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("query {id} has width {found}, but the profile has width {expected}")]
    QueryWidthMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("alignment of {id} failed: {reason}")]
    Alignment { id: String, reason: String },
    #[error("alignment width {width} is narrower than the context window {window}")]
    TooShort { width: usize, window: usize },
    #[error("model exceeded {limit} states")]
    StateLimit { limit: usize },
    #[error("the model has no state to decode")]
    EmptyModel,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CorrectionError {
    /// True if the whole run should stop. Otherwise only the current record is dropped.
    /// A width mismatch comes from one query, so it is not fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            CorrectionError::Configuration(ConfigurationError::QueryWidthMismatch { .. }) => false,
            CorrectionError::Configuration(_) | CorrectionError::Io(_) => true,
            _ => false,
        }
    }
}
