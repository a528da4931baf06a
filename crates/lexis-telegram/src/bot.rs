//! Long-polling loop and per-chat dispatch.
//!
//! The poll loop never waits on the engine. Each chat gets a worker task fed
//! by an unbounded queue, so messages from one chat are answered strictly in
//! arrival order while different chats proceed concurrently. A worker that
//! stays idle for [`CHAT_IDLE`] removes itself; the next message for that chat
//! starts a fresh one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use lexis_chat::{LookupEngine, NavigationTokens, Reply, ReplyRenderer, UserId};
use lexis_core::config::TelegramConfig;

use crate::api::BotApi;
use crate::error::Result;
use crate::split::split_message;
use crate::types::{Message, ReplyKeyboardMarkup, SendMessage, Update};

const CHAT_IDLE: Duration = Duration::from_secs(600);

/// Sent in place of a blank reply, which the Bot API rejects.
const BLANK_REPLY: &str = "...";

/// What a chat message asks the engine for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Refresh,
    /// Pass this text to `LookupEngine::handle`.
    Text(String),
}

/// Map Telegram commands onto engine input.
///
/// `/refresh` reloads the table. `/start` (also as `/start@botname`) becomes a
/// configured start token. Everything else goes through unchanged.
pub fn route(text: &str, tokens: &NavigationTokens) -> Route {
    let trimmed = text.trim();
    if let Some(first) = trimmed.split_whitespace().next() {
        if first.starts_with('/') {
            let command = first.split('@').next().unwrap_or(first);
            match command {
                "/refresh" => return Route::Refresh,
                "/start" => {
                    let token = if tokens.start.iter().any(|t| t == "/start") {
                        "/start"
                    } else {
                        tokens.start.first().map(String::as_str).unwrap_or("/start")
                    };
                    return Route::Text(token.to_string());
                }
                _ => {}
            }
        }
    }
    Route::Text(text.to_string())
}

struct BotInner {
    api: BotApi,
    engine: Arc<LookupEngine>,
    renderer: ReplyRenderer,
    max_message_chars: usize,
    error_backoff: Duration,
    chats: DashMap<i64, UnboundedSender<Message>>,
}

/// Telegram front end for a [`LookupEngine`].
#[derive(Clone)]
pub struct TelegramBot {
    inner: Arc<BotInner>,
}

impl TelegramBot {
    pub fn new(
        api: BotApi,
        engine: Arc<LookupEngine>,
        renderer: ReplyRenderer,
        config: &TelegramConfig,
    ) -> Self {
        Self {
            inner: Arc::new(BotInner {
                api,
                engine,
                renderer,
                max_message_chars: config.max_message_chars,
                error_backoff: Duration::from_secs(config.error_backoff_secs),
                chats: DashMap::new(),
            }),
        }
    }

    /// Poll for updates until `shutdown` resolves.
    ///
    /// Polling errors are logged and retried after the configured backoff.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut offset: Option<i64> = None;
        info!("Telegram polling started");

        loop {
            let polled = tokio::select! {
                _ = &mut shutdown => break,
                res = self.inner.api.get_updates(offset) => res,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = self.inner.error_backoff.as_secs(), "getUpdates failed");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.inner.error_backoff) => {}
                    }
                }
            }
        }

        info!("Telegram polling stopped");
    }

    /// Queue an update on its chat's worker.
    pub fn dispatch(&self, update: Update) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Skipping non-message update");
            return;
        };
        if message.text.is_none() || message.from.as_ref().is_some_and(|u| u.is_bot) {
            debug!(update_id = update.update_id, "Skipping message without text");
            return;
        }

        let chat_id = message.chat.id;
        // The send happens under the shard lock so a worker cannot retire
        // between the lookup and the send.
        let sender = self
            .inner
            .chats
            .entry(chat_id)
            .or_insert_with(|| self.spawn_worker(chat_id));
        if sender.send(message).is_err() {
            warn!(chat = chat_id, "Chat worker gone; message dropped");
        }
    }

    /// Number of chats with a live worker.
    pub fn active_chats(&self) -> usize {
        self.inner.chats.len()
    }

    fn spawn_worker(&self, chat_id: i64) -> UnboundedSender<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(chat_worker(inner, chat_id, rx));
        debug!(chat = chat_id, "Chat worker started");
        tx
    }
}

async fn chat_worker(inner: Arc<BotInner>, chat_id: i64, mut rx: UnboundedReceiver<Message>) {
    loop {
        match tokio::time::timeout(CHAT_IDLE, rx.recv()).await {
            Ok(Some(message)) => inner.process(message).await,
            Ok(None) => return,
            Err(_) => {
                if inner
                    .chats
                    .remove_if(&chat_id, |_, _| rx.is_empty())
                    .is_some()
                {
                    debug!(chat = chat_id, "Chat worker retired");
                    return;
                }
            }
        }
    }
}

impl BotInner {
    async fn process(&self, message: Message) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let chat_id = message.chat.id;
        let user = message
            .from
            .as_ref()
            .map(|u| UserId::from(u.id))
            .unwrap_or_else(|| UserId::from(chat_id));

        let response = match route(text, self.engine.tokens()) {
            Route::Refresh => self.engine.refresh(&user).await,
            Route::Text(input) => self.engine.handle(&user, &input).await,
        };
        let reply = self.renderer.render(&response);

        match self.send_reply(chat_id, &reply).await {
            Ok(sent) => debug!(chat = chat_id, user = %user, messages = sent, "Replied"),
            Err(e) => warn!(chat = chat_id, user = %user, error = %e, "Failed to send reply"),
        }
    }

    /// Send `reply` in as many messages as the length limit needs, and at
    /// least one. Only the last one carries the keyboard.
    async fn send_reply(&self, chat_id: i64, reply: &Reply) -> Result<usize> {
        let mut chunks = split_message(&reply.text, self.max_message_chars);
        if chunks.is_empty() {
            warn!(chat = chat_id, "Blank reply text; sending placeholder");
            chunks.push(BLANK_REPLY.to_string());
        }
        let count = chunks.len();

        for (i, text) in chunks.into_iter().enumerate() {
            let reply_markup = if i + 1 == count {
                reply.keyboard.as_ref().map(ReplyKeyboardMarkup::from)
            } else {
                None
            };
            self.api
                .send_message(&SendMessage {
                    chat_id,
                    text,
                    reply_markup,
                })
                .await?;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use lexis_chat::PaginationSession;
    use lexis_core::config::{LexisConfig, MessagesConfig};
    use lexis_core::error::Result as LexisResult;
    use lexis_core::types::{RawRow, SourceRef};
    use lexis_source::{ContentCache, TableFetcher};

    struct StaticFetcher(Vec<RawRow>);

    #[async_trait]
    impl TableFetcher for StaticFetcher {
        async fn fetch(&self, _source: &SourceRef) -> LexisResult<Vec<RawRow>> {
            Ok(self.0.clone())
        }
    }

    /// Mock Bot API: hands out `updates` once, records every sendMessage.
    #[derive(Clone)]
    struct MockApi {
        updates: Arc<Mutex<Option<Value>>>,
        sent: Arc<Mutex<Vec<Value>>>,
        fail_polls: Arc<AtomicBool>,
    }

    async fn get_updates(State(mock): State<MockApi>) -> Json<Value> {
        if mock.fail_polls.swap(false, Ordering::SeqCst) {
            return Json(json!({"ok": false, "error_code": 502, "description": "Bad Gateway"}));
        }
        let pending = mock.updates.lock().unwrap().take();
        match pending {
            Some(updates) => Json(json!({"ok": true, "result": updates})),
            None => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Json(json!({"ok": true, "result": []}))
            }
        }
    }

    async fn send_message(State(mock): State<MockApi>, Json(body): Json<Value>) -> Json<Value> {
        mock.sent.lock().unwrap().push(body.clone());
        Json(json!({
            "ok": true,
            "result": {"message_id": 1, "chat": {"id": body["chat_id"]}, "text": body["text"]}
        }))
    }

    async fn start_mock(updates: Value) -> (String, MockApi) {
        let mock = MockApi {
            updates: Arc::new(Mutex::new(Some(updates))),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_polls: Arc::new(AtomicBool::new(false)),
        };
        let router = Router::new()
            .route("/botT/getUpdates", post(get_updates))
            .route("/botT/sendMessage", post(send_message))
            .with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), mock)
    }

    fn make_bot(base: &str, rows: Vec<RawRow>, max_message_chars: usize) -> TelegramBot {
        make_bot_with(base, rows, max_message_chars, MessagesConfig::default())
    }

    fn make_bot_with(
        base: &str,
        rows: Vec<RawRow>,
        max_message_chars: usize,
        messages: MessagesConfig,
    ) -> TelegramBot {
        let config = LexisConfig::default();
        let source = SourceRef {
            url: "http://sheet.invalid".to_string(),
            key_column: "number".to_string(),
            value_column: "text".to_string(),
        };
        let cache = ContentCache::new(Arc::new(StaticFetcher(rows)), source);
        let tokens = NavigationTokens::from_config(&config.pagination);
        let renderer = ReplyRenderer::new(messages, &tokens);
        let engine = LookupEngine::new(
            Arc::new(cache),
            Arc::new(PaginationSession::new(config.pagination.page_size)),
            tokens,
        );
        let telegram = TelegramConfig {
            api_base: base.to_string(),
            poll_timeout_secs: 0,
            max_message_chars,
            error_backoff_secs: 0,
        };
        let api = BotApi::new(&telegram.api_base, "T", telegram.poll_timeout_secs).unwrap();
        TelegramBot::new(api, Arc::new(engine), renderer, &telegram)
    }

    fn text_update(update_id: i64, chat: i64, text: &str) -> Value {
        json!({
            "update_id": update_id,
            "message": {
                "message_id": update_id,
                "chat": {"id": chat, "type": "private"},
                "from": {"id": chat, "is_bot": false},
                "text": text
            }
        })
    }

    fn rows(n: usize) -> Vec<RawRow> {
        (1..=n)
            .map(|i| RawRow::new(i.to_string(), format!("Article {}", i)))
            .collect()
    }

    /// Run the bot until `expected` messages were sent, then stop it.
    async fn run_until_sent(bot: &TelegramBot, mock: &MockApi, expected: usize) -> Vec<Value> {
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let runner = {
            let bot = bot.clone();
            tokio::spawn(async move {
                bot.run(async {
                    let _ = stop_rx.await;
                })
                .await;
            })
        };

        for _ in 0..200 {
            if mock.sent.lock().unwrap().len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = stop_tx.send(());
        runner.await.unwrap();
        let sent = mock.sent.lock().unwrap().clone();
        sent
    }

    // ---- route ----

    #[test]
    fn test_route_commands() {
        let tokens = NavigationTokens::default();
        assert_eq!(route("/refresh", &tokens), Route::Refresh);
        assert_eq!(route("/refresh@lexis_bot", &tokens), Route::Refresh);
        assert_eq!(route("/start", &tokens), Route::Text("/start".to_string()));
        assert_eq!(
            route("/start@lexis_bot", &tokens),
            Route::Text("/start".to_string())
        );
        assert_eq!(route("12", &tokens), Route::Text("12".to_string()));
    }

    #[test]
    fn test_route_start_maps_to_configured_token() {
        let tokens = NavigationTokens {
            start: vec!["boshlash".to_string()],
            next: "keyingi".to_string(),
            previous: "oldingi".to_string(),
        };
        assert_eq!(
            route("/start", &tokens),
            Route::Text("boshlash".to_string())
        );
    }

    // ---- polling ----

    #[tokio::test]
    async fn test_conversation_replies_in_order() {
        let updates = json!([
            text_update(1, 42, "/start"),
            text_update(2, 42, "next"),
            text_update(3, 42, "6"),
        ]);
        let (base, mock) = start_mock(updates).await;
        let bot = make_bot(&base, rows(6), 4096);

        let sent = run_until_sent(&bot, &mock, 3).await;
        assert_eq!(sent.len(), 3);

        let prompt = MessagesConfig::default().prompt;
        assert_eq!(sent[0]["text"], prompt.as_str());
        let first_rows = sent[0]["reply_markup"]["keyboard"].as_array().unwrap();
        assert_eq!(first_rows.len(), 6);
        assert_eq!(first_rows[5][0]["text"], "next");

        assert_eq!(sent[1]["reply_markup"]["keyboard"][0][0]["text"], "6");
        assert_eq!(sent[2]["text"], "Article 6");
        assert!(sent.iter().all(|m| m["chat_id"] == 42));
    }

    #[tokio::test]
    async fn test_long_article_split_with_keyboard_on_last_chunk() {
        let long = "word ".repeat(1500);
        let (base, mock) = start_mock(json!([text_update(7, 9, "1")])).await;
        let bot = make_bot(&base, vec![RawRow::new("1", long)], 4096);

        let sent = run_until_sent(&bot, &mock, 2).await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].get("reply_markup").is_none());
        assert!(sent[1]["reply_markup"]["keyboard"].is_array());
        assert!(sent
            .iter()
            .all(|m| m["text"].as_str().unwrap().chars().count() <= 4096));
    }

    #[tokio::test]
    async fn test_blank_reply_still_sends_keyboard() {
        let (base, mock) = start_mock(json!([text_update(1, 8, "/start")])).await;
        let messages = MessagesConfig {
            prompt: "   ".to_string(),
            ..MessagesConfig::default()
        };
        let bot = make_bot_with(&base, rows(2), 4096, messages);

        let sent = run_until_sent(&bot, &mock, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["text"], BLANK_REPLY);
        assert_eq!(sent[0]["reply_markup"]["keyboard"][0][0]["text"], "1");
    }

    #[tokio::test]
    async fn test_astral_article_chunks_fit_utf16_limit() {
        let long = "\u{1F4D6} ".repeat(1500);
        let (base, mock) = start_mock(json!([text_update(4, 6, "1")])).await;
        let bot = make_bot(&base, vec![RawRow::new("1", long)], 4096);

        let sent = run_until_sent(&bot, &mock, 2).await;
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|m| crate::split::utf16_len(m["text"].as_str().unwrap()) <= 4096));
    }

    #[tokio::test]
    async fn test_refresh_command_returns_first_page() {
        let (base, mock) = start_mock(json!([
            text_update(1, 5, "next"),
            text_update(2, 5, "/refresh"),
        ]))
        .await;
        let bot = make_bot(&base, rows(8), 4096);

        let sent = run_until_sent(&bot, &mock, 2).await;
        assert_eq!(sent[0]["reply_markup"]["keyboard"][0][0]["text"], "6");
        assert_eq!(sent[1]["reply_markup"]["keyboard"][0][0]["text"], "1");
    }

    #[tokio::test]
    async fn test_poll_error_is_retried() {
        let (base, mock) = start_mock(json!([text_update(1, 3, "/start")])).await;
        mock.fail_polls.store(true, Ordering::SeqCst);
        let bot = make_bot(&base, rows(2), 4096);

        let sent = run_until_sent(&bot, &mock, 1).await;
        assert_eq!(sent.len(), 1);
    }

    #[tokio::test]
    async fn test_non_text_and_bot_messages_are_skipped() {
        let (base, _mock) = start_mock(json!([])).await;
        let bot = make_bot(&base, rows(2), 4096);

        bot.dispatch(Update {
            update_id: 1,
            message: None,
        });
        bot.dispatch(Update {
            update_id: 2,
            message: Some(Message {
                message_id: 2,
                chat: crate::types::Chat { id: 1 },
                from: None,
                text: None,
            }),
        });
        bot.dispatch(Update {
            update_id: 3,
            message: Some(Message {
                message_id: 3,
                chat: crate::types::Chat { id: 1 },
                from: Some(crate::types::User {
                    id: 99,
                    is_bot: true,
                }),
                text: Some("start".to_string()),
            }),
        });
        assert_eq!(bot.active_chats(), 0);
    }
}
