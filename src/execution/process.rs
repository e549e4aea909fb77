//! Process invocation.
//!
//! Spawns a task's underlying OS process, applying working-directory and
//! environment overrides, capturing output, and bounding the attempt with the
//! task's timeout and the caller's cancellation token. Dispatch on the task
//! kind happens here, before anything is spawned: `script` runs through the
//! same path as `command`, and `http` fails without a process ever starting.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::core::task::{Task, TaskKind};

/// Errors from a single invocation attempt.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The command string tokenized to nothing.
    #[error("empty command")]
    EmptyCommand,

    /// The process could not be started.
    #[error("failed to start process: {0}")]
    Spawn(String),

    /// The process exited with a nonzero status. Captured output is carried
    /// along so the result store can still record it.
    #[error("command exited with code {code}")]
    CommandFailed { code: i32, output: String },

    /// The per-attempt deadline expired; the child is killed when the output
    /// future is dropped.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired mid-attempt.
    #[error("task cancelled")]
    Cancelled,

    /// The task kind has no executable form.
    #[error("task type '{0}' is not implemented")]
    Unsupported(TaskKind),
}

/// Output of a successful invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Combined stdout and stderr text.
    pub output: String,
    /// Process exit code (always zero on success).
    pub exit_code: i32,
}

/// Run one attempt of `task`, honoring its timeout and the caller's token.
pub async fn execute(task: &Task, cancel: &CancellationToken) -> Result<ProcessOutput, InvokeError> {
    match task.kind {
        TaskKind::Command | TaskKind::Script => run_process(task, cancel).await,
        TaskKind::Http => Err(InvokeError::Unsupported(task.kind)),
    }
}

async fn run_process(task: &Task, cancel: &CancellationToken) -> Result<ProcessOutput, InvokeError> {
    let mut cmd = build_command(task)?;

    // Dropping the output future kills the child, so a deadline or a
    // cancellation leaves no process behind.
    let run = cmd.output();

    let spawned = if task.timeout.is_zero() {
        tokio::select! {
            out = run => out,
            _ = cancel.cancelled() => return Err(InvokeError::Cancelled),
        }
    } else {
        tokio::select! {
            out = timeout(task.timeout, run) => match out {
                Ok(out) => out,
                Err(_) => return Err(InvokeError::Timeout(task.timeout)),
            },
            _ = cancel.cancelled() => return Err(InvokeError::Cancelled),
        }
    };

    let output = spawned.map_err(|e| InvokeError::Spawn(e.to_string()))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(ProcessOutput {
            output: combined,
            exit_code: 0,
        })
    } else {
        Err(InvokeError::CommandFailed {
            code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}

/// Assemble the command: explicit args are used verbatim, otherwise the
/// command string is whitespace-tokenized and the first token is the program.
fn build_command(task: &Task) -> Result<Command, InvokeError> {
    let mut cmd = if task.args.is_empty() {
        let mut parts = task.command.split_whitespace();
        let program = parts.next().ok_or(InvokeError::EmptyCommand)?;
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd
    } else {
        let mut cmd = Command::new(&task.command);
        cmd.args(&task.args);
        cmd
    };

    if let Some(dir) = &task.working_dir {
        cmd.current_dir(dir);
    }

    // Overrides win over the inherited environment on key collision.
    for (key, value) in task.env.iter() {
        cmd.env(key, value);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::Environment;
    use std::time::Instant;

    fn command_task(command: &str) -> Task {
        Task::new("test", "Test", TaskKind::Command, command)
    }

    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let task = command_task("echo").with_args(["hello"]);

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "hello");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test]
    async fn test_command_string_is_whitespace_tokenized() {
        let task = command_task("echo hello world");

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_explicit_args_bypass_tokenization() {
        // A single argument containing spaces must survive intact.
        let task = command_task("echo").with_args(["one two"]);

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "one two");
    }

    #[tokio::test]
    async fn test_output_combines_stdout_and_stderr() {
        let task = command_task("sh").with_args(["-c", "echo out; echo err >&2"]);

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_code_and_output() {
        let task = command_task("sh").with_args(["-c", "echo partial; exit 42"]);

        let err = execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            InvokeError::CommandFailed { code, output } => {
                assert_eq!(code, 42);
                assert!(output.contains("partial"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_environment_override_reaches_process() {
        let task = command_task("sh")
            .with_args(["-c", "echo $GREETING"])
            .with_env(Environment::new().with_var("GREETING", "howdy"));

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "howdy");
    }

    #[tokio::test]
    async fn test_working_directory_override() {
        let task = command_task("pwd").with_working_dir("/tmp");

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "/tmp");
    }

    #[tokio::test]
    async fn test_empty_command_never_spawns() {
        let task = command_task("   ");

        let err = execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let task = command_task("definitely-not-a-real-binary-1234");

        let err = execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_timeout_fires_before_process_finishes() {
        let task = command_task("sleep")
            .with_args(["10"])
            .with_timeout(Duration::from_millis(100));

        let start = Instant::now();
        let err = execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        match err {
            InvokeError::Timeout(d) => assert_eq!(d, Duration::from_millis(100)),
            other => panic!("expected Timeout, got {:?}", other),
        }
        // Returned promptly, not after the full sleep.
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_invocation() {
        let task = command_task("sleep").with_args(["10"]);
        let cancel = CancellationToken::new();

        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            child.cancel();
        });

        let start = Instant::now();
        let err = execute(&task, &cancel).await.unwrap_err();

        assert!(matches!(err, InvokeError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_script_kind_runs_like_command() {
        let task = Task::new("s", "Script", TaskKind::Script, "echo from-script");

        let out = execute(&task, &CancellationToken::new()).await.unwrap();

        assert_eq!(out.output.trim(), "from-script");
    }

    #[tokio::test]
    async fn test_http_kind_fails_without_invocation() {
        let task = Task::new("h", "Http", TaskKind::Http, "https://example.com");

        let err = execute(&task, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "task type 'http' is not implemented");
        match err {
            InvokeError::Unsupported(kind) => assert_eq!(kind, TaskKind::Http),
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }
}
