//! Conversational core for Lexis.
//!
//! Provides per-user pagination, input classification, the lookup engine
//! that ties them to the content cache, and reply rendering for adapters.

pub mod engine;
pub mod input;
pub mod render;
pub mod session;
pub mod types;

pub use engine::LookupEngine;
pub use input::{Command, NavigationTokens};
pub use render::{Keyboard, Reply, ReplyRenderer};
pub use session::{PaginationCursor, PaginationSession};
pub use types::{PageView, Response, UserId};
