//! Domain-specific configuration modules

pub mod execution;
pub mod logging;
pub mod server;
pub mod tools;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main Capstan configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CapstanConfig {
    /// Subprocess execution configuration
    #[serde(default)]
    pub execution: execution::ExecutionConfig,

    /// External tool configuration
    #[serde(default)]
    pub tools: tools::ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,

    /// Server configuration (optional, for server mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<server::ServerConfig>,
}

impl CapstanConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.execution.validate()?;
        self.tools.validate()?;
        self.logging.validate()?;

        if let Some(ref server) = self.server {
            server.validate()?;
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = CapstanConfig {
            server: Some(server::ServerConfig::default()),
            ..CapstanConfig::default()
        };
        serde_yaml::to_string(&config).unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
