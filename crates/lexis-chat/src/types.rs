//! Values exchanged between the lookup engine and chat adapters.

use serde::{Deserialize, Serialize};

use lexis_core::error::ErrorKind;

/// Opaque chat user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of keys as seen by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView {
    pub items: Vec<String>,
    /// Zero-based.
    pub page_index: usize,
    /// At least 1, even for an empty key list.
    pub page_count: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Outcome of one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// A navigation input was applied (possibly as a boundary no-op).
    Navigation { page: PageView },
    /// The input named a key. `value` is the full, untruncated text.
    Content {
        key: String,
        value: String,
        page: PageView,
    },
    /// The input matched neither a navigation token nor a key.
    Miss { input: String, page: PageView },
    /// The table could not be loaded.
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// The page an adapter should keep showing, if any.
    pub fn page(&self) -> Option<&PageView> {
        match self {
            Response::Navigation { page }
            | Response::Content { page, .. }
            | Response::Miss { page, .. } => Some(page),
            Response::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
