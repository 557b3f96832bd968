//! Capstan Server
//!
//! Binds inbound job requests to supervised subprocess tasks: each request
//! gets a process-lifetime-unique identifier, a registered task, and exactly
//! one terminal response unless its connection closes first.

pub mod api;
pub mod error;
pub mod manager;
pub mod models;
pub mod tasks;

// Re-export main types
pub use api::{create_app, AppState};
pub use error::{ServerError, ServerResult};
pub use manager::{TaskKind, TaskManager};
pub use models::TaskResponse;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use capstan_config::CapstanConfig;

/// Run the dispatch server until shutdown
pub async fn serve(config: CapstanConfig) -> ServerResult<()> {
    let server = config.server.unwrap_or_default();

    let manager = Arc::new(TaskManager::new(config.tools, config.execution));
    let app = create_app(AppState::new(manager), &server.cors);

    let addr: SocketAddr = format!("{}:{}", server.bind_address, server.port)
        .parse()
        .map_err(|e| {
            ServerError::InvalidBindAddress(format!(
                "{}:{} ({})",
                server.bind_address, server.port, e
            ))
        })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
