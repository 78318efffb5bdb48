//! Errors raised by SQL lineage extraction.
//!
//! None of these abort a batch: the extractor records them per object and
//! moves on to the next definition.

/// Error type for SQL extraction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SqlExtractError {
    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    #[error("Failed to parse {object}: {message}")]
    Parse { object: String, message: String },
}

pub type SqlExtractResult<T> = Result<T, SqlExtractError>;
