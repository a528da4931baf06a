//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};

use lexis_chat::{LookupEngine, ReplyRenderer};
use lexis_core::config::LexisConfig;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks. The engine
/// owns its own synchronization, so nothing here needs a lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LexisConfig>,
    pub engine: Arc<LookupEngine>,
    pub renderer: Arc<ReplyRenderer>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: LexisConfig, engine: Arc<LookupEngine>) -> Self {
        let renderer = ReplyRenderer::new(config.messages.clone(), engine.tokens());
        Self {
            config: Arc::new(config),
            engine,
            renderer: Arc::new(renderer),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}
