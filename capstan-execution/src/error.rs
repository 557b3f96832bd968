//! Error types for subprocess execution

use thiserror::Error;

/// Subprocess execution result type
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Subprocess execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The command could not be started at all
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while supervising a running child
    #[error("I/O error while supervising '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit with the retry budget spent
    #[error("Command '{command}' failed with exit code {exit_code} after {attempts} attempt(s)")]
    CommandFailed {
        command: String,
        attempts: u32,
        exit_code: i32,
        stderr: String,
    },

    /// A processor job that cannot be rendered as a command line
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),
}
