//! Lexis Telegram crate - long-polling bot adapter for the lookup engine.
//!
//! [`BotApi`] speaks the handful of Bot API methods the adapter needs,
//! [`TelegramBot`] runs the polling loop and routes each message through the
//! shared [`lexis_chat::LookupEngine`].

pub mod api;
pub mod bot;
pub mod error;
pub mod split;
pub mod types;

pub use api::BotApi;
pub use bot::{route, Route, TelegramBot};
pub use error::TelegramError;
pub use split::{split_message, utf16_len};
