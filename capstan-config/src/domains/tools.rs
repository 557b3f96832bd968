//! External tool configuration
//!
//! The tasks this server dispatches are performed by external binaries; the
//! server only needs to know where they live.

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// External tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path or name of the process-execution binary (queue-script and
    /// exec-process modes)
    #[serde(default = "default_process_exe")]
    pub process_exe: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            process_exe: default_process_exe(),
        }
    }
}

impl Validatable for ToolsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.process_exe, "process_exe", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "tools"
    }
}

fn default_process_exe() -> String {
    "mproc".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_config_validation() {
        let mut config = ToolsConfig::default();
        assert!(config.validate().is_ok());

        config.process_exe = String::new();
        assert!(config.validate().is_err());
    }
}
