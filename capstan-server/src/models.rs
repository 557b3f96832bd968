//! Wire payloads for the dispatch API

use serde::{Deserialize, Serialize};

use capstan_execution::ProcessorJob;

/// Terminal result delivered exactly once per dispatched request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl TaskResponse {
    pub fn success_with_exit(exit_code: i32) -> Self {
        Self {
            success: true,
            error: None,
            exit_code: Some(exit_code),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            exit_code: None,
        }
    }
}

/// Parameters for the queueScript action
#[derive(Debug, Clone, Deserialize)]
pub struct QueueScriptParams {
    #[serde(default)]
    pub script: String,
}

/// Parameters for the execProcess action
#[derive(Debug, Clone, Deserialize)]
pub struct ExecProcessParams {
    pub jobs: Vec<ProcessorJob>,

    /// Overrides the configured batch parallelism cap
    #[serde(default)]
    pub max_parallel: Option<usize>,
}
