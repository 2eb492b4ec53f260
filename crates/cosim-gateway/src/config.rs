//! Gateway configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::Generation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Session-level settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Opcode table the session speaks
    #[serde(default)]
    pub generation: Generation,
    /// Require `args[0]` to restate the dispatched opcode
    #[serde(default = "default_true")]
    pub verify_opcode_echo: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            generation: Generation::default(),
            verify_opcode_echo: default_true(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl GatewayConfig {
    pub fn for_generation(generation: Generation) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
