//! Turns engine responses into text plus a button layout.
//!
//! Adapters show `Reply::text` and lay out `Reply::keyboard` as reply
//! buttons. Each button's label is exactly the text it sends back, so a tap
//! on an article or a navigation button round-trips through the engine.

use serde::{Deserialize, Serialize};

use lexis_core::config::MessagesConfig;
use lexis_core::error::ErrorKind;

use crate::input::NavigationTokens;
use crate::types::{PageView, Response};

/// Rows of button labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
}

/// A rendered answer for one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

/// Renders [`Response`] values with configured texts.
#[derive(Debug, Clone)]
pub struct ReplyRenderer {
    messages: MessagesConfig,
    next_label: String,
    previous_label: String,
}

impl ReplyRenderer {
    pub fn new(messages: MessagesConfig, tokens: &NavigationTokens) -> Self {
        Self {
            messages,
            next_label: tokens.next.clone(),
            previous_label: tokens.previous.clone(),
        }
    }

    pub fn render(&self, response: &Response) -> Reply {
        match response {
            Response::Navigation { page } => Reply {
                text: if page.items.is_empty() {
                    self.messages.empty_page.clone()
                } else {
                    self.messages.prompt.clone()
                },
                keyboard: self.keyboard(page),
            },
            Response::Content { value, page, .. } => Reply {
                text: value.clone(),
                keyboard: self.keyboard(page),
            },
            Response::Miss { page, .. } => Reply {
                text: self.messages.not_found.clone(),
                keyboard: self.keyboard(page),
            },
            Response::Error { kind, .. } => Reply {
                text: self.error_text(*kind).to_string(),
                keyboard: None,
            },
        }
    }

    /// One row per article, then a row with the legal directions.
    pub fn keyboard(&self, page: &PageView) -> Option<Keyboard> {
        let mut rows: Vec<Vec<String>> = page.items.iter().map(|k| vec![k.clone()]).collect();

        let mut nav = Vec::new();
        if page.has_prev {
            nav.push(self.previous_label.clone());
        }
        if page.has_next {
            nav.push(self.next_label.clone());
        }
        if !nav.is_empty() {
            rows.push(nav);
        }

        if rows.is_empty() {
            None
        } else {
            Some(Keyboard { rows })
        }
    }

    fn error_text(&self, kind: ErrorKind) -> &str {
        match kind {
            ErrorKind::SourceUnavailable => &self.messages.source_unavailable,
            ErrorKind::MalformedSource => &self.messages.malformed_source,
            ErrorKind::EmptyResult => &self.messages.empty_result,
        }
    }
}
