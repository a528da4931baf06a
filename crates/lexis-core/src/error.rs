use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the Lexis system.
///
/// The first three variants are the failure kinds of a table load and are the
/// only ones a chat user ever sees (as [`ErrorKind`]). The rest belong to
/// process setup and the adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LexisError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Source produced no usable rows")]
    EmptyResult,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LexisError {
    /// The user-facing kind of a load failure, if this is one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LexisError::SourceUnavailable(_) => Some(ErrorKind::SourceUnavailable),
            LexisError::MalformedSource(_) => Some(ErrorKind::MalformedSource),
            LexisError::EmptyResult => Some(ErrorKind::EmptyResult),
            _ => None,
        }
    }
}

/// Load failure kinds surfaced through `Response::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedSource,
    EmptyResult,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::MalformedSource => "malformed_source",
            ErrorKind::EmptyResult => "empty_result",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<toml::de::Error> for LexisError {
    fn from(err: toml::de::Error) -> Self {
        LexisError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LexisError {
    fn from(err: toml::ser::Error) -> Self {
        LexisError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for LexisError {
    fn from(err: serde_json::Error) -> Self {
        LexisError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Lexis operations.
pub type Result<T> = std::result::Result<T, LexisError>;
