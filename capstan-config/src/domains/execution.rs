//! Subprocess execution configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Subprocess execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Total launch attempts per processor invocation; relaunches happen on
    /// non-zero exit until the budget is spent
    #[serde(default = "default_num_tries")]
    pub num_tries: u32,

    /// Maximum number of processor jobs in flight within one batch
    #[serde(default = "default_max_parallel_jobs")]
    pub max_parallel_jobs: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            num_tries: default_num_tries(),
            max_parallel_jobs: default_max_parallel_jobs(),
        }
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.num_tries, "num_tries", self.domain_name())?;
        validate_positive(self.max_parallel_jobs, "max_parallel_jobs", self.domain_name())?;

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}

// Default value functions
fn default_num_tries() -> u32 {
    2
}

fn default_max_parallel_jobs() -> usize {
    1
}
