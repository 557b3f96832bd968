//! Concrete task bodies dispatched by the task manager

use tracing::{info, warn};

use capstan_config::{ExecutionConfig, ToolsConfig};
use capstan_execution::{execute, for_each_parallel, launch, CallOptions, CommandSpec};

use crate::models::{ExecProcessParams, QueueScriptParams, TaskResponse};

/// Queue a script through the process tool.
///
/// Output streams go to the log only, and the exit code is reported to the
/// caller without being interpreted; only a launch failure is an error.
pub async fn queue_script(tools: ToolsConfig, params: QueueScriptParams) -> TaskResponse {
    let spec = CommandSpec::new(&tools.process_exe)
        .arg("queue-script")
        .arg(&params.script);

    match launch(&spec, &CallOptions::log_only()).await {
        Ok(output) => {
            info!(exit_code = output.exit_code, "queued script finished");
            TaskResponse::success_with_exit(output.exit_code)
        }
        Err(e) => {
            warn!(error = %e, "failed to launch queue-script");
            TaskResponse::failure(e.to_string())
        }
    }
}

/// Run a batch of processor jobs under the parallelism cap.
///
/// Each job gets the configured retry budget; the batch succeeds only when
/// every processor exits zero. The first failing processor (in job order) is
/// named in the error.
pub async fn exec_process(
    tools: ToolsConfig,
    execution: ExecutionConfig,
    params: ExecProcessParams,
) -> TaskResponse {
    let max_parallel = params.max_parallel.unwrap_or(execution.max_parallel_jobs);
    let options = CallOptions::with_tries(execution.num_tries);

    let results = for_each_parallel(params.jobs, max_parallel, |_, job| {
        let tools = tools.clone();
        let options = options.clone();
        async move {
            let processor = job.processor.clone();
            let spec = match job.to_command(&tools) {
                Ok(spec) => spec,
                Err(e) => return Err((processor, e.to_string())),
            };
            match execute(&spec, &options).await {
                Ok(_) => {
                    info!(processor = %processor, "processor completed");
                    Ok(())
                }
                Err(e) => Err((processor, e.to_string())),
            }
        }
    })
    .await;

    for result in results {
        if let Err((processor, error)) = result {
            warn!(processor = %processor, error = %error, "processor failed");
            return TaskResponse::failure(format!("Processor '{}' failed: {}", processor, error));
        }
    }

    TaskResponse::success_with_exit(0)
}
