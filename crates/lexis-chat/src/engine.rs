//! Lookup engine: central coordinator wiring cache, cursors, and input parsing.
//!
//! Every user turn resolves the current table, then dispatches on a fixed
//! precedence: navigation tokens, exact key match, miss. Load failures come
//! back as [`Response::Error`] rather than as a Rust error, because they are
//! an answer the user has to see.

use std::sync::Arc;

use tracing::{debug, warn};

use lexis_core::error::{ErrorKind, LexisError};
use lexis_source::ContentCache;

use crate::input::{Command, NavigationTokens};
use crate::session::PaginationSession;
use crate::types::{Response, UserId};

/// Resolves user text against the shared cache and per-user cursors.
pub struct LookupEngine {
    cache: Arc<ContentCache>,
    sessions: Arc<PaginationSession>,
    tokens: NavigationTokens,
}

impl LookupEngine {
    pub fn new(
        cache: Arc<ContentCache>,
        sessions: Arc<PaginationSession>,
        tokens: NavigationTokens,
    ) -> Self {
        Self {
            cache,
            sessions,
            tokens,
        }
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub fn sessions(&self) -> &Arc<PaginationSession> {
        &self.sessions
    }

    pub fn tokens(&self) -> &NavigationTokens {
        &self.tokens
    }

    /// Handle one inbound message from `user`.
    pub async fn handle(&self, user: &UserId, text: &str) -> Response {
        let table = match self.cache.get().await {
            Ok(table) => table,
            Err(e) => return error_response(user, e),
        };
        let keys = table.keys();

        let command = self.tokens.parse(text);
        debug!(user = %user, command = ?command, "Handling input");

        match command {
            Command::Start => {
                self.sessions.reset(user);
                Response::Navigation {
                    page: self.sessions.page_for(user, keys),
                }
            }
            Command::Next => {
                self.sessions.advance(user, keys.len());
                Response::Navigation {
                    page: self.sessions.page_for(user, keys),
                }
            }
            Command::Previous => {
                self.sessions.retreat(user, keys.len());
                Response::Navigation {
                    page: self.sessions.page_for(user, keys),
                }
            }
            Command::Lookup(input) => {
                let page = self.sessions.page_for(user, keys);
                match table.get(&input) {
                    Some(value) => Response::Content {
                        key: input,
                        value: value.to_string(),
                        page,
                    },
                    None => Response::Miss { input, page },
                }
            }
        }
    }

    /// Reload the table and send `user` back to the first page.
    ///
    /// On failure the previous table and the user's cursor stay as they were.
    pub async fn refresh(&self, user: &UserId) -> Response {
        match self.cache.refresh().await {
            Ok(table) => {
                self.sessions.reset(user);
                Response::Navigation {
                    page: self.sessions.page_for(user, table.keys()),
                }
            }
            Err(e) => error_response(user, e),
        }
    }
}

fn error_response(user: &UserId, err: LexisError) -> Response {
    warn!(user = %user, error = %err, "Table unavailable for user turn");
    Response::Error {
        kind: err.kind().unwrap_or(ErrorKind::SourceUnavailable),
        message: err.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
