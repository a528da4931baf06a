//! Minimal Bot API client over `reqwest`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, TelegramError};
use crate::types::{ApiResponse, GetUpdates, Message, SendMessage, Update};

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const POLL_SLACK: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct BotApi {
    client: reqwest::Client,
    /// `{api_base}/bot{token}`, without a trailing slash.
    base_url: String,
    poll_timeout_secs: u64,
}

impl BotApi {
    pub fn new(api_base: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TelegramError::Config("bot token is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs) + POLL_SLACK)
            .user_agent(concat!("lexis/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            poll_timeout_secs,
        })
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let params = GetUpdates {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: vec!["message".to_string()],
        };
        self.call("getUpdates", &params).await
    }

    pub async fn send_message(&self, message: &SendMessage) -> Result<Message> {
        self.call("sendMessage", message).await
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        debug!(method, "Bot API call");

        let response = self.client.post(&url).json(params).send().await?;
        let status = response.status();
        let body: ApiResponse<R> = response.json().await.map_err(|e| {
            TelegramError::InvalidResponse(format!("{} returned {}: {}", method, status, e))
        })?;

        if !body.ok {
            return Err(TelegramError::Api {
                code: body.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: body.description.unwrap_or_default(),
            });
        }

        body.result.ok_or_else(|| {
            TelegramError::InvalidResponse(format!("{} returned ok without a result", method))
        })
    }
}
