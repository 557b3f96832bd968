//! Request-scoped task registry and dispatch
//!
//! The manager owns the mapping from request identifier to its in-flight
//! task. A task completes by resolving its completion channel exactly once;
//! closing a request removes the entry, aborts the task, and suppresses the
//! pending result. Completion and closure both serialize on the registry
//! lock, so they are mutually exclusive.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value as JsonValue;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use capstan_config::{ExecutionConfig, ToolsConfig};

use crate::models::{ExecProcessParams, QueueScriptParams, TaskResponse};
use crate::tasks;

/// Recognized action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    QueueScript,
    ExecProcess,
}

impl TaskKind {
    fn parse(action: &str) -> Option<Self> {
        match action {
            "queueScript" => Some(TaskKind::QueueScript),
            "execProcess" => Some(TaskKind::ExecProcess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::QueueScript => "queueScript",
            TaskKind::ExecProcess => "execProcess",
        }
    }
}

/// One registered in-flight task
struct RunningTask {
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// Owns the registry of in-flight tasks, keyed by request identifier
pub struct TaskManager {
    tools: ToolsConfig,
    execution: ExecutionConfig,
    tasks: Arc<Mutex<HashMap<u64, RunningTask>>>,
}

impl TaskManager {
    pub fn new(tools: ToolsConfig, execution: ExecutionConfig) -> Self {
        Self {
            tools,
            execution,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of tasks currently registered
    pub async fn active_tasks(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Dispatch one request.
    ///
    /// The returned channel resolves with exactly one terminal response,
    /// unless the request is closed first, in which case it never resolves.
    /// Unrecognized actions and malformed parameters resolve immediately
    /// without registering anything or touching a subprocess.
    pub async fn handle_request(
        &self,
        request_id: u64,
        payload: JsonValue,
    ) -> oneshot::Receiver<TaskResponse> {
        let (tx, rx) = oneshot::channel();

        let Some(action) = payload.get("action").and_then(JsonValue::as_str) else {
            warn!(request_id, "request has no action field");
            let _ = tx.send(TaskResponse::failure("Malformed request: missing 'action' field"));
            return rx;
        };

        let Some(kind) = TaskKind::parse(action) else {
            warn!(request_id, action, "unrecognized action");
            let _ = tx.send(TaskResponse::failure(format!("Unrecognized action: {}", action)));
            return rx;
        };

        let task = match self.build_task(kind, payload) {
            Ok(task) => task,
            Err(response) => {
                warn!(request_id, action = kind.as_str(), "rejected task parameters");
                let _ = tx.send(response);
                return rx;
            }
        };

        info!(request_id, action = kind.as_str(), "task started");

        // Hold the registry lock across the spawn so the task cannot observe
        // a completion before its own entry exists.
        let registry = Arc::clone(&self.tasks);
        let mut tasks = self.tasks.lock().await;
        let handle = tokio::spawn(async move {
            let response = task.await;
            let mut tasks = registry.lock().await;
            if tasks.remove(&request_id).is_some() {
                debug!(request_id, success = response.success, "task completed");
                let _ = tx.send(response);
            } else {
                debug!(request_id, "task already closed, dropping result");
            }
        });
        tasks.insert(request_id, RunningTask { kind, handle });

        rx
    }

    /// Cancel and forget the task registered under `request_id`.
    ///
    /// The task is aborted, which reaps its child process via kill-on-drop,
    /// and its pending result is never delivered. Closing an unknown or
    /// already-closed identifier is a no-op.
    pub async fn close_request(&self, request_id: u64) {
        let removed = self.tasks.lock().await.remove(&request_id);
        match removed {
            Some(task) => {
                info!(request_id, action = task.kind.as_str(), "task closed");
                task.handle.abort();
            }
            None => debug!(request_id, "close for unknown request id"),
        }
    }

    /// Construct the concrete task body for a recognized action
    fn build_task(
        &self,
        kind: TaskKind,
        payload: JsonValue,
    ) -> Result<BoxFuture<'static, TaskResponse>, TaskResponse> {
        match kind {
            TaskKind::QueueScript => {
                let params: QueueScriptParams = serde_json::from_value(payload).map_err(|e| {
                    TaskResponse::failure(format!("Malformed queueScript request: {}", e))
                })?;
                Ok(Box::pin(tasks::queue_script(self.tools.clone(), params)))
            }
            TaskKind::ExecProcess => {
                let params: ExecProcessParams = serde_json::from_value(payload).map_err(|e| {
                    TaskResponse::failure(format!("Malformed execProcess request: {}", e))
                })?;
                if params.jobs.is_empty() {
                    return Err(TaskResponse::failure(
                        "execProcess requires at least one job",
                    ));
                }
                Ok(Box::pin(tasks::exec_process(
                    self.tools.clone(),
                    self.execution.clone(),
                    params,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn manager_with_tool(process_exe: &str) -> TaskManager {
        let tools = ToolsConfig {
            process_exe: process_exe.to_string(),
        };
        TaskManager::new(tools, ExecutionConfig::default())
    }

    /// Stage an executable stub standing in for the process tool
    fn write_stub_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("stub-tool.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn test_unrecognized_action_fails_without_registration() {
        let manager = manager_with_tool("echo");

        let rx = manager.handle_request(2, json!({ "action": "bogus" })).await;
        let response = rx.await.unwrap();

        assert_eq!(
            response,
            TaskResponse::failure("Unrecognized action: bogus")
        );
        assert_eq!(manager.active_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_missing_action_is_malformed() {
        let manager = manager_with_tool("echo");

        let rx = manager.handle_request(1, json!({ "script": "hi" })).await;
        let response = rx.await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_queue_script_reports_exit_code() {
        // An echo binary stands in for the process tool; it exits 0
        let manager = manager_with_tool("echo");

        let rx = manager
            .handle_request(1, json!({ "action": "queueScript", "script": "echo hi" }))
            .await;
        let response = rx.await.unwrap();

        assert_eq!(response, TaskResponse::success_with_exit(0));
        assert_eq!(manager.active_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_queue_script_launch_failure_is_reported() {
        let manager = manager_with_tool("/no/such/binary/anywhere");

        let rx = manager
            .handle_request(1, json!({ "action": "queueScript", "script": "x" }))
            .await;
        let response = rx.await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("Failed to spawn"));
    }

    #[tokio::test]
    async fn test_close_suppresses_result_and_clears_registry() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub_tool(dir.path(), "sleep 5");
        let manager = manager_with_tool(stub.to_str().unwrap());

        let rx = manager
            .handle_request(3, json!({ "action": "queueScript", "script": "x" }))
            .await;
        assert_eq!(manager.active_tasks().await, 1);

        // Let the task get underway before tearing it down
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.close_request(3).await;

        // No result is ever delivered for a closed request
        assert!(rx.await.is_err());
        assert_eq!(manager.active_tasks().await, 0);

        // Closing twice is a no-op
        manager.close_request(3).await;
    }

    #[tokio::test]
    async fn test_exec_process_success() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub_tool(dir.path(), "exit 0");
        let manager = manager_with_tool(stub.to_str().unwrap());

        let rx = manager
            .handle_request(
                4,
                json!({
                    "action": "execProcess",
                    "jobs": [
                        { "processor": "first", "parameters": { "x": 1 } },
                        { "processor": "second" }
                    ],
                    "max_parallel": 2
                }),
            )
            .await;
        let response = rx.await.unwrap();

        assert_eq!(response, TaskResponse::success_with_exit(0));
    }

    #[tokio::test]
    async fn test_exec_process_retries_then_fails() {
        let dir = tempfile::tempdir().unwrap();
        let counter = dir.path().join("count");
        let stub = write_stub_tool(
            dir.path(),
            &format!("echo run >> {}; exit 3", counter.display()),
        );
        let manager = manager_with_tool(stub.to_str().unwrap());

        let rx = manager
            .handle_request(
                5,
                json!({
                    "action": "execProcess",
                    "jobs": [{ "processor": "flaky" }]
                }),
            )
            .await;
        let response = rx.await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("flaky"));

        // Default budget is two attempts
        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_exec_process_rejects_empty_jobs() {
        let manager = manager_with_tool("echo");

        let rx = manager
            .handle_request(6, json!({ "action": "execProcess", "jobs": [] }))
            .await;
        let response = rx.await.unwrap();

        assert!(!response.success);
        assert_eq!(manager.active_tasks().await, 0);
    }

    #[tokio::test]
    async fn test_exec_process_malformed_jobs_rejected() {
        let manager = manager_with_tool("echo");

        let rx = manager
            .handle_request(7, json!({ "action": "execProcess", "jobs": "nope" }))
            .await;
        let response = rx.await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("Malformed execProcess request"));
    }
}
