//! Process-level settings

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, SessionConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Default per-session configuration; the config-resolution layer may
    /// override fields per agent
    #[serde(default)]
    pub session: SessionConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from an optional file plus `VOICE_LOOP_`-prefixed
    /// environment variables (e.g. `VOICE_LOOP_SESSION__MAX_TOKENS=128`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix("VOICE_LOOP").separator("__"))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        tracing::info!(
            environment = ?settings.environment,
            buffer_policy = ?settings.session.buffer_policy,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()
    }
}
