//! Subprocess launching with stream capture and a fixed retry budget

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ExecutionError, ExecutionResult};

/// A program plus its ordered argument list
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Rendered form used in logs and error messages
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Options for one command execution
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Total launch attempts; relaunches happen only on non-zero exit
    pub num_tries: u32,

    /// Accumulate stdout into the returned buffer; when false the stream is
    /// forwarded line-by-line to the log instead
    pub capture_stdout: bool,

    /// Same as `capture_stdout`, for stderr
    pub capture_stderr: bool,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            num_tries: 1,
            capture_stdout: true,
            capture_stderr: true,
        }
    }
}

impl CallOptions {
    /// Capture both streams with the given retry budget
    pub fn with_tries(num_tries: u32) -> Self {
        Self {
            num_tries: num_tries.max(1),
            ..Self::default()
        }
    }

    /// Single attempt, both streams routed to the log only
    pub fn log_only() -> Self {
        Self {
            num_tries: 1,
            capture_stdout: false,
            capture_stderr: false,
        }
    }
}

/// Terminal state of one completed child process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Launch one attempt of `spec`, draining stdout/stderr until the child
/// exits.
///
/// The exit status is reported, not interpreted; callers that want the
/// retry policy use [`execute`]. Only a failure to start or supervise the
/// child is an error.
pub async fn launch(spec: &CommandSpec, options: &CallOptions) -> ExecutionResult<CommandOutput> {
    debug!(command = %spec.display(), "launching subprocess");

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutionError::SpawnFailed {
            command: spec.display(),
            source: e,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| ExecutionError::Io {
        command: spec.display(),
        source: std::io::Error::other("child stdout was not piped"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ExecutionError::Io {
        command: spec.display(),
        source: std::io::Error::other("child stderr was not piped"),
    })?;

    let program = spec.program.clone();
    let stdout_task = tokio::spawn(read_stream(
        stdout,
        "stdout",
        options.capture_stdout,
        program.clone(),
    ));
    let stderr_task = tokio::spawn(read_stream(
        stderr,
        "stderr",
        options.capture_stderr,
        program,
    ));

    let status = child.wait().await.map_err(|e| ExecutionError::Io {
        command: spec.display(),
        source: e,
    })?;

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();

    // A child killed by a signal has no exit code; -1 marks it as failed
    let exit_code = status.code().unwrap_or(-1);
    debug!(command = %spec.program, exit_code, "subprocess exited");

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
    })
}

/// Run `spec` to successful completion, relaunching on non-zero exit until
/// the retry budget is spent.
///
/// Buffers from a failed attempt are discarded; only the final attempt's
/// output is returned. The attempt counter is carried here per call, never
/// on the shared options value.
pub async fn execute(spec: &CommandSpec, options: &CallOptions) -> ExecutionResult<CommandOutput> {
    let num_tries = options.num_tries.max(1);
    let mut attempt = 1;

    loop {
        info!(command = %spec.display(), attempt, num_tries, "executing command");

        let output = launch(spec, options).await?;

        if output.is_success() {
            if attempt > 1 {
                info!(command = %spec.program, attempt, "command succeeded after retry");
            }
            return Ok(output);
        }

        if attempt >= num_tries {
            warn!(
                command = %spec.display(),
                exit_code = output.exit_code,
                attempts = attempt,
                "command failed, retry budget exhausted"
            );
            if !output.stderr.is_empty() {
                warn!(command = %spec.program, "stderr from final attempt:\n{}", output.stderr);
            }
            return Err(ExecutionError::CommandFailed {
                command: spec.display(),
                attempts: attempt,
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        warn!(
            command = %spec.display(),
            exit_code = output.exit_code,
            attempt,
            "command failed, retrying"
        );
        attempt += 1;
    }
}

/// Drain one child stream, either into a buffer or into the log
async fn read_stream<R>(stream: R, label: &'static str, capture: bool, program: String) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut collected = String::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if capture {
                    collected.push_str(&line);
                    collected.push('\n');
                } else {
                    debug!(%program, "{}: {}", label, line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%program, "failed to read child {}: {}", label, e);
                break;
            }
        }
    }

    collected
}
