use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LexisError, Result};
use crate::types::SourceRef;

/// Top-level configuration for Lexis.
///
/// Loaded from `~/.lexis/config.toml` by default. Every section has defaults,
/// so an empty file is valid apart from the source location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexisConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl LexisConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LexisConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unparsable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.pagination.page_size == 0 {
            return Err(LexisError::Config(
                "pagination.page_size must be at least 1".to_string(),
            ));
        }
        if self.source.timeout_secs == 0 {
            return Err(LexisError::Config(
                "source.timeout_secs must be at least 1".to_string(),
            ));
        }

        if let Some(name) = self.messages.blank_field() {
            return Err(LexisError::Config(format!(
                "messages.{} must not be blank",
                name
            )));
        }

        let tokens = self.pagination.reserved_tokens();
        if tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(LexisError::Config(
                "navigation tokens must not be empty".to_string(),
            ));
        }
        for (i, a) in tokens.iter().enumerate() {
            if tokens[i + 1..].contains(a) {
                return Err(LexisError::Config(format!(
                    "navigation token '{}' is used for more than one command",
                    a
                )));
            }
        }
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Load the table once at startup instead of on the first message.
    pub warm_cache: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            warm_cache: true,
        }
    }
}

/// Where the article table comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Direct CSV URL. Takes precedence over the spreadsheet fields.
    pub url: Option<String>,
    /// Google Sheets document id, exported as CSV.
    pub spreadsheet_id: Option<String>,
    /// Sheet tab id within the document.
    pub sheet_gid: u64,
    /// Header of the identifier column.
    pub key_column: String,
    /// Header of the text column.
    pub value_column: String,
    /// Fetch deadline in seconds.
    pub timeout_secs: u64,
    /// Reload a table older than this on the next read. Unset disables expiry.
    pub ttl_secs: Option<u64>,
    /// Fail a load whose keys collide with a navigation token.
    pub reject_reserved_keys: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            spreadsheet_id: None,
            sheet_gid: 0,
            key_column: "number".to_string(),
            value_column: "text".to_string(),
            timeout_secs: 10,
            ttl_secs: None,
            reject_reserved_keys: true,
        }
    }
}

impl SourceConfig {
    /// Resolve the configured location into a [`SourceRef`].
    pub fn source_ref(&self) -> Result<SourceRef> {
        let url = match (&self.url, &self.spreadsheet_id) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, Some(id)) if !id.trim().is_empty() => format!(
                "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
                id.trim(),
                self.sheet_gid
            ),
            _ => {
                return Err(LexisError::Config(
                    "source.url or source.spreadsheet_id must be set".to_string(),
                ))
            }
        };
        Ok(SourceRef {
            url,
            key_column: self.key_column.clone(),
            value_column: self.value_column.clone(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Paging and the reserved navigation inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Keys shown per page.
    pub page_size: usize,
    /// Inputs that open the first page.
    pub start_tokens: Vec<String>,
    /// Input that moves one page forward.
    pub next_token: String,
    /// Input that moves one page back.
    pub previous_token: String,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            start_tokens: vec!["start".to_string(), "/start".to_string()],
            next_token: "next".to_string(),
            previous_token: "previous".to_string(),
        }
    }
}

impl PaginationConfig {
    /// Every input consumed by navigation.
    pub fn reserved_tokens(&self) -> Vec<String> {
        let mut tokens = self.start_tokens.clone();
        tokens.push(self.next_token.clone());
        tokens.push(self.previous_token.clone());
        tokens
    }
}

/// Texts rendered by the chat adapters. Navigation buttons are labelled
/// with the navigation tokens themselves so a tap round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    /// Shown above the page keyboard.
    pub prompt: String,
    /// Shown when the input matched nothing.
    pub not_found: String,
    /// Shown when the table has no entries to page through.
    pub empty_page: String,
    pub source_unavailable: String,
    pub malformed_source: String,
    pub empty_result: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            prompt: "Which article would you like to read?".to_string(),
            not_found: "No such article. Pick one from the list or send /start.".to_string(),
            empty_page: "There are no articles to show.".to_string(),
            source_unavailable: "The article source is unreachable right now. Please try again later."
                .to_string(),
            malformed_source: "The article source is misconfigured. Please contact the operator."
                .to_string(),
            empty_result: "The article source is empty.".to_string(),
        }
    }
}

impl MessagesConfig {
    /// Name of the first message that is empty or whitespace only.
    pub fn blank_field(&self) -> Option<&'static str> {
        [
            ("prompt", &self.prompt),
            ("not_found", &self.not_found),
            ("empty_page", &self.empty_page),
            ("source_unavailable", &self.source_unavailable),
            ("malformed_source", &self.malformed_source),
            ("empty_result", &self.empty_result),
        ]
        .into_iter()
        .find(|(_, text)| text.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// HTTP adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
        }
    }
}

/// Telegram polling adapter settings. The bot token comes from the
/// environment, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API base URL.
    pub api_base: String,
    /// Long-poll wait passed to `getUpdates`.
    pub poll_timeout_secs: u64,
    /// Split article text above this many characters.
    pub max_message_chars: usize,
    /// Pause after a failed poll before retrying.
    pub error_backoff_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            max_message_chars: 4096,
            error_backoff_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = LexisConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.general.warm_cache);
        assert_eq!(config.source.key_column, "number");
        assert_eq!(config.source.value_column, "text");
        assert_eq!(config.source.timeout_secs, 10);
        assert!(config.source.ttl_secs.is_none());
        assert!(config.source.reject_reserved_keys);
        assert_eq!(config.pagination.page_size, 5);
        assert_eq!(config.pagination.next_token, "next");
        assert_eq!(config.pagination.previous_token, "previous");
        assert_eq!(config.server.port, 3040);
        assert_eq!(config.telegram.max_message_chars, 4096);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"
warm_cache = false

[source]
url = "https://example.com/articles.csv"
key_column = "raqam"
value_column = "matn"
timeout_secs = 3
ttl_secs = 600

[pagination]
page_size = 8
start_tokens = ["/start"]
next_token = "keyingi"
previous_token = "oldingi"
"#;
        let file = create_temp_config(content);
        let config = LexisConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.general.warm_cache);
        assert_eq!(config.source.key_column, "raqam");
        assert_eq!(config.source.timeout(), Duration::from_secs(3));
        assert_eq!(config.source.ttl(), Some(Duration::from_secs(600)));
        assert_eq!(config.pagination.page_size, 8);
        assert_eq!(config.pagination.next_token, "keyingi");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[pagination]
page_size = 3
"#;
        let file = create_temp_config(content);
        let config = LexisConfig::load(file.path()).unwrap();
        assert_eq!(config.pagination.page_size, 3);
        assert_eq!(config.pagination.next_token, "next");
        assert_eq!(config.source.timeout_secs, 10);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = LexisConfig::load_or_default(Path::new("/nonexistent/lexis.toml"));
        assert_eq!(config.pagination.page_size, 5);
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(matches!(
            LexisConfig::load(file.path()),
            Err(LexisError::Config(_))
        ));
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = LexisConfig::default();
        config.source.url = Some("https://example.com/a.csv".to_string());
        config.save(&path).unwrap();

        let reloaded = LexisConfig::load(&path).unwrap();
        assert_eq!(reloaded.source.url, config.source.url);
        assert_eq!(reloaded.pagination.page_size, config.pagination.page_size);
    }

    #[test]
    fn test_source_ref_prefers_url() {
        let source = SourceConfig {
            url: Some(" https://example.com/a.csv ".to_string()),
            spreadsheet_id: Some("abc".to_string()),
            ..SourceConfig::default()
        };
        let r = source.source_ref().unwrap();
        assert_eq!(r.url, "https://example.com/a.csv");
        assert_eq!(r.key_column, "number");
        assert_eq!(r.value_column, "text");
    }

    #[test]
    fn test_source_ref_from_spreadsheet() {
        let source = SourceConfig {
            spreadsheet_id: Some("1AbC".to_string()),
            sheet_gid: 42,
            ..SourceConfig::default()
        };
        let r = source.source_ref().unwrap();
        assert_eq!(
            r.url,
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv&gid=42"
        );
    }

    #[test]
    fn test_source_ref_missing_location() {
        let source = SourceConfig {
            url: Some("  ".to_string()),
            ..SourceConfig::default()
        };
        assert!(matches!(source.source_ref(), Err(LexisError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let mut config = LexisConfig::default();
        config.pagination.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = LexisConfig::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_tokens() {
        let mut config = LexisConfig::default();
        config.pagination.previous_token = "next".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'next'"));
    }

    #[test]
    fn test_validate_rejects_blank_token() {
        let mut config = LexisConfig::default();
        config.pagination.next_token = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_message() {
        let mut config = LexisConfig::default();
        config.messages.not_found = "  \n".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("messages.not_found"));
    }

    #[test]
    fn test_reserved_tokens_lists_all_commands() {
        let tokens = PaginationConfig::default().reserved_tokens();
        assert_eq!(tokens, vec!["start", "/start", "next", "previous"]);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = LexisConfig::load(file.path()).unwrap();
        assert_eq!(config.pagination.page_size, 5);
        assert!(config.source.url.is_none());
        assert!(config.validate().is_ok());
    }
}
