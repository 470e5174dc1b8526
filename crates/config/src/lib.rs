//! Configuration for the voice turn engine
//!
//! Layers:
//! - `Settings`: process-level configuration loaded from file + environment
//! - `SessionConfig`: per-session knobs resolved at session creation
//! - `constants`: fixed engine constants

pub mod constants;
mod session;
mod settings;

use thiserror::Error;

pub use session::{
    BufferPolicy, QueueCapacities, RetrievalConfig, SessionConfig, TurnTimeouts, VadGateConfig,
};
pub use settings::{RuntimeEnvironment, Settings};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Load(e.to_string())
    }
}
