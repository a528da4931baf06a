//! Lexis API crate - axum HTTP adapter for the lookup engine.
//!
//! Exposes the chat loop over JSON so any front end (a web widget, a test
//! harness, another bot bridge) can drive the same engine the Telegram
//! adapter uses.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
