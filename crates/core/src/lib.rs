pub mod config;
pub mod error;
pub mod logging;
pub mod presets;
pub mod think;
pub mod transcript;

pub use config::{AppConfig, CompletionParams, Config, ConfigError, Secrets};
pub use error::{Error, Result};
pub use presets::SystemPreset;
pub use transcript::{ChatMessage, Role};
