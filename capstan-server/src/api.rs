//! HTTP dispatch front: one buffered JSON request in, one JSON response out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use http::{HeaderName, HeaderValue, Method};
use serde_json::{json, Value as JsonValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use capstan_config::CorsConfig;

use crate::manager::TaskManager;
use crate::models::TaskResponse;

/// Shared state for the dispatch routes
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    request_counter: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(manager: Arc<TaskManager>) -> Self {
        Self {
            manager,
            request_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Monotonically increasing, unique for the process lifetime
    fn next_request_id(&self) -> u64 {
        self.request_counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Build the dispatch router with CORS and tracing layers
pub fn create_app(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", post(dispatch))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "active_tasks": state.manager.active_tasks().await,
    }))
}

/// Dispatch one buffered request to the task manager and relay its single
/// terminal response. If the client disconnects first, the dropped handler
/// closes the task instead.
async fn dispatch(State(state): State<AppState>, body: Bytes) -> Json<TaskResponse> {
    let payload: JsonValue = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "malformed request payload");
            return Json(TaskResponse::failure(format!("Malformed request: {}", e)));
        }
    };

    let request_id = state.next_request_id();
    debug!(request_id, "request received");

    let mut guard = CloseGuard::new(Arc::clone(&state.manager), request_id);

    let receiver = state.manager.handle_request(request_id, payload).await;
    let response = match receiver.await {
        Ok(response) => response,
        Err(_) => TaskResponse::failure("Task ended without a result"),
    };

    guard.disarm();
    Json(response)
}

/// Closes the request on drop unless the response made it out.
///
/// Hyper drops the handler future when the connection is torn down, which
/// makes future-drop the connection-close signal.
struct CloseGuard {
    manager: Arc<TaskManager>,
    request_id: u64,
    armed: bool,
}

impl CloseGuard {
    fn new(manager: Arc<TaskManager>, request_id: u64) -> Self {
        Self {
            manager,
            request_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!(request_id = self.request_id, "connection closed before response");
            let manager = Arc::clone(&self.manager);
            let request_id = self.request_id;
            tokio::spawn(async move {
                manager.close_request(request_id).await;
            });
        }
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new().max_age(config.max_age);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|method| method.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = config
        .allowed_headers
        .iter()
        .filter_map(|header| header.parse().ok())
        .collect();

    layer
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
}
