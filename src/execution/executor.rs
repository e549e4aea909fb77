//! Task execution engine.
//!
//! The [`Executor`] owns the task registry and the result store, drives tasks
//! in dependency order, and applies per-task retry with a fixed backoff.
//! Execution is strictly sequential; the registry sits behind a single
//! read/write lock so results can be read from another thread while a run is
//! in progress.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::resolver::{execution_order, ResolveError};
use crate::core::task::{Task, TaskStatus, ValidationError};
use crate::core::types::TaskId;
use crate::execution::process::{self, InvokeError};

/// Fixed delay between retry attempts.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Errors returned by executor operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A task failed validation at registration.
    #[error("invalid task: {0}")]
    InvalidTask(#[from] ValidationError),

    /// A task with this identifier is already registered.
    #[error("task '{0}' is already registered")]
    DuplicateTask(TaskId),

    /// No tasks are registered.
    #[error("no tasks to execute")]
    NoTasks,

    /// The identifier does not name a registered task.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The execution order could not be built.
    #[error("failed to build execution order: {0}")]
    Resolve(#[from] ResolveError),

    /// A task with no configured retries failed, aborting the run.
    #[error("task '{id}' failed: {error}")]
    TaskFailed { id: TaskId, error: String },
}

/// Outcome of driving one task to a terminal state.
///
/// One result is recorded per attempt-group (not per retry); re-running a
/// task overwrites its previous result.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Snapshot of the task, including its final runtime fields.
    pub task: Task,
    /// Whether the task succeeded.
    pub success: bool,
    /// Combined output captured from the final attempt.
    pub output: String,
    /// Error from the final attempt; `None` on success.
    pub error: Option<String>,
    /// Wall-clock duration of the final attempt.
    pub duration: Duration,
    /// Process exit code; `-1` when no process produced one.
    pub exit_code: i32,
    /// Number of attempts made; zero for skipped tasks.
    pub attempts: u32,
}

/// Registered tasks, their registration order, and recorded results.
///
/// Held behind one lock so `reset` discards everything atomically and
/// readers never observe a task set without its results.
#[derive(Default)]
struct Registry {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
    results: HashMap<TaskId, TaskResult>,
}

/// Sequential task executor with a concurrently-readable result store.
pub struct Executor {
    registry: RwLock<Registry>,
    /// Reserved: accepted for interface compatibility, but scheduling is
    /// strictly sequential and this value has no effect on it.
    concurrency: usize,
    verbose: bool,
}

impl Executor {
    /// Create a new executor.
    ///
    /// `concurrency` is normalized to at least 1 and stored unused (see the
    /// field note); `verbose` raises attempt narration from debug to info.
    pub fn new(concurrency: usize, verbose: bool) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            concurrency: concurrency.max(1),
            verbose,
        }
    }

    /// The configured (reserved) concurrency degree.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Register a single task.
    ///
    /// Fails if the task is invalid or the identifier is already taken; a
    /// duplicate registration leaves the existing task untouched.
    pub fn register(&self, task: Task) -> Result<(), ExecutorError> {
        task.validate()?;

        let mut registry = self.write_registry();
        if registry.tasks.contains_key(&task.id) {
            return Err(ExecutorError::DuplicateTask(task.id));
        }

        registry.order.push(task.id.clone());
        registry.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Register tasks in order, stopping at the first failure.
    ///
    /// Tasks registered before the failure remain registered.
    pub fn register_all(&self, tasks: Vec<Task>) -> Result<(), ExecutorError> {
        for task in tasks {
            self.register(task)?;
        }
        Ok(())
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.read_registry().tasks.len()
    }

    /// Check whether any tasks are registered.
    pub fn is_empty(&self) -> bool {
        self.read_registry().tasks.is_empty()
    }

    /// Execute every registered task in dependency order.
    ///
    /// Tasks whose dependencies did not succeed are recorded as skipped. A
    /// failing task with zero configured retries aborts the run immediately,
    /// leaving later tasks without any recorded result; a failing task with
    /// retries configured lets the run continue (its dependents skip).
    pub async fn run_all(&self, cancel: &CancellationToken) -> Result<(), ExecutorError> {
        let (tasks, registration_order) = {
            let registry = self.read_registry();
            if registry.tasks.is_empty() {
                return Err(ExecutorError::NoTasks);
            }
            (registry.tasks.clone(), registry.order.clone())
        };

        let order = execution_order(&tasks, &registration_order)?;
        debug!(task_count = order.len(), "built execution order");

        for id in &order {
            if let Some(unmet) = self.first_unmet_dependency(id) {
                self.record_skip(id, &unmet);
                continue;
            }

            let result = self.execute_with_retry(cancel, id).await?;
            let failed = !result.success;
            let error = result.error.clone().unwrap_or_default();
            let retry_count = result.task.retry_count;
            self.write_registry().results.insert(id.clone(), result);

            if failed && retry_count == 0 {
                return Err(ExecutorError::TaskFailed {
                    id: id.clone(),
                    error,
                });
            }
        }

        Ok(())
    }

    /// Execute a single task by identifier, ignoring its dependencies.
    pub async fn run_one(
        &self,
        cancel: &CancellationToken,
        id: &TaskId,
    ) -> Result<TaskResult, ExecutorError> {
        let result = self.execute_with_retry(cancel, id).await?;
        self.write_registry()
            .results
            .insert(id.clone(), result.clone());
        Ok(result)
    }

    /// Snapshot of all recorded results.
    pub fn results(&self) -> HashMap<TaskId, TaskResult> {
        self.read_registry().results.clone()
    }

    /// Look up a single recorded result.
    pub fn result(&self, id: &TaskId) -> Option<TaskResult> {
        self.read_registry().results.get(id).cloned()
    }

    /// Discard all registered tasks and all results together.
    pub fn reset(&self) {
        let mut registry = self.write_registry();
        *registry = Registry::default();
    }

    /// Drive one task to a terminal outcome: up to `retry_count + 1`
    /// attempts with a fixed backoff between them.
    async fn execute_with_retry(
        &self,
        cancel: &CancellationToken,
        id: &TaskId,
    ) -> Result<TaskResult, ExecutorError> {
        let max_attempts = {
            let registry = self.read_registry();
            let task = registry
                .tasks
                .get(id)
                .ok_or_else(|| ExecutorError::TaskNotFound(id.clone()))?;
            task.retry_count + 1
        };

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let snapshot = self.begin_attempt(id)?;
            self.narrate(format_args!(
                "executing task '{}' (attempt {}/{})",
                snapshot.name, attempt, max_attempts
            ));

            let started = Instant::now();
            let outcome = process::execute(&snapshot, cancel).await;
            let duration = started.elapsed();

            let result = self.finish_attempt(id, outcome, duration, attempt)?;

            if result.success {
                self.narrate(format_args!(
                    "task '{}' completed successfully ({:.2}s)",
                    result.task.name,
                    result.duration.as_secs_f64()
                ));
                return Ok(result);
            }

            if attempt < max_attempts {
                warn!(
                    task = %id,
                    attempt,
                    max_attempts,
                    error = result.error.as_deref().unwrap_or(""),
                    "task failed, retrying after backoff"
                );
                sleep(RETRY_BACKOFF).await;
            } else {
                self.narrate(format_args!(
                    "task '{}' failed after {} attempt(s)",
                    result.task.name, attempt
                ));
                return Ok(result);
            }
        }
    }

    /// Mark the task running, stamp its start time, and return a snapshot to
    /// invoke. The lock is released before the attempt awaits anything.
    fn begin_attempt(&self, id: &TaskId) -> Result<Task, ExecutorError> {
        let mut registry = self.write_registry();
        let task = registry
            .tasks
            .get_mut(id)
            .ok_or_else(|| ExecutorError::TaskNotFound(id.clone()))?;
        task.status = TaskStatus::Running;
        task.started_at = Some(Utc::now());
        task.finished_at = None;
        Ok(task.clone())
    }

    /// Record the attempt's terminal state on the task and build its result.
    fn finish_attempt(
        &self,
        id: &TaskId,
        outcome: Result<process::ProcessOutput, InvokeError>,
        duration: Duration,
        attempts: u32,
    ) -> Result<TaskResult, ExecutorError> {
        let mut registry = self.write_registry();
        let task = registry
            .tasks
            .get_mut(id)
            .ok_or_else(|| ExecutorError::TaskNotFound(id.clone()))?;
        task.finished_at = Some(Utc::now());

        let (success, output, error, exit_code) = match outcome {
            Ok(out) => (true, out.output, None, out.exit_code),
            Err(err) => {
                let (output, exit_code) = match &err {
                    InvokeError::CommandFailed { code, output } => (output.clone(), *code),
                    _ => (String::new(), -1),
                };
                (false, output, Some(err.to_string()), exit_code)
            }
        };

        task.status = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        task.output = output.clone();
        task.error = error.clone();

        Ok(TaskResult {
            task: task.clone(),
            success,
            output,
            error,
            duration,
            exit_code,
            attempts,
        })
    }

    /// Return the first dependency of `id` without a successful result.
    fn first_unmet_dependency(&self, id: &TaskId) -> Option<TaskId> {
        let registry = self.read_registry();
        let task = registry.tasks.get(id)?;
        task.depends_on
            .iter()
            .find(|dep| {
                registry
                    .results
                    .get(*dep)
                    .map(|r| !r.success)
                    .unwrap_or(true)
            })
            .cloned()
    }

    /// Mark `id` skipped and record an unsuccessful result naming the unmet
    /// dependency, without invoking anything.
    fn record_skip(&self, id: &TaskId, unmet: &TaskId) {
        let mut registry = self.write_registry();
        let Some(task) = registry.tasks.get_mut(id) else {
            return;
        };
        task.status = TaskStatus::Skipped;
        let snapshot = task.clone();

        info!(task = %id, dependency = %unmet, "skipping task, dependency not satisfied");

        registry.results.insert(
            id.clone(),
            TaskResult {
                task: snapshot,
                success: false,
                output: String::new(),
                error: Some(format!("dependency '{}' was not satisfied", unmet)),
                duration: Duration::ZERO,
                exit_code: -1,
                attempts: 0,
            },
        );
    }

    fn narrate(&self, message: std::fmt::Arguments<'_>) {
        if self.verbose {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }

    fn read_registry(&self) -> std::sync::RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }
}
