//! Error types for the dispatch server

use thiserror::Error;

/// Server result type
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised while bringing the server up or tearing it down
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] capstan_config::ConfigError),
}
