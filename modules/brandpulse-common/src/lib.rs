pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{Config, PageBackend};
pub use error::ConfigError;
pub use identity::{BlockType, QuoraQuestion, SiteBlock};
pub use types::*;
