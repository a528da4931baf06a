pub mod config;
pub mod error;
pub mod normalize;
pub mod types;

pub use config::LexisConfig;
pub use error::{ErrorKind, LexisError, Result};
pub use normalize::{normalize, TextNormalizer};
pub use types::*;
