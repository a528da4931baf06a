//! Classification of raw user input.
//!
//! Navigation tokens take precedence over key lookups: an input equal to a
//! token is always consumed by navigation, even if a key with the same text
//! exists.

use lexis_core::config::PaginationConfig;

/// What a user turn asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the first page.
    Start,
    Next,
    Previous,
    /// Look up the trimmed input as a key.
    Lookup(String),
}

/// The reserved inputs, compared against trimmed text exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTokens {
    pub start: Vec<String>,
    pub next: String,
    pub previous: String,
}

impl Default for NavigationTokens {
    fn default() -> Self {
        Self::from_config(&PaginationConfig::default())
    }
}

impl NavigationTokens {
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            start: config
                .start_tokens
                .iter()
                .map(|t| t.trim().to_string())
                .collect(),
            next: config.next_token.trim().to_string(),
            previous: config.previous_token.trim().to_string(),
        }
    }

    pub fn parse(&self, text: &str) -> Command {
        let input = text.trim();
        if input == self.next {
            Command::Next
        } else if input == self.previous {
            Command::Previous
        } else if self.start.iter().any(|t| t == input) {
            Command::Start
        } else {
            Command::Lookup(input.to_string())
        }
    }

    pub fn is_reserved(&self, text: &str) -> bool {
        !matches!(self.parse(text), Command::Lookup(_))
    }
}
