//! Task entity and validation.
//!
//! A [`Task`] is a configuration-described unit of work: what to run, where,
//! with which environment, how long to wait, and how often to retry. Runtime
//! status fields live on the same struct but are never part of the persisted
//! configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::environment::Environment;
use super::types::TaskId;

/// Errors produced by task validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("task {0} is required")]
    MissingField(&'static str),
}

/// The kind of work a task performs.
///
/// A closed set: `script` currently behaves exactly like `command`, and
/// `http` is a declared, testable "not implemented" outcome. An absent or
/// unknown tag is rejected when the configuration is deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Execute an external command.
    Command,
    /// Execute a script file (runs through the same process path as `Command`).
    Script,
    /// Make an HTTP request (not implemented).
    Http,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskKind::Command => "command",
            TaskKind::Script => "script",
            TaskKind::Http => "http",
        };
        write!(f, "{}", s)
    }
}

/// Execution status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet executed.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed after all attempts.
    Failed,
    /// Not executed because a dependency did not succeed.
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// A single automation task.
///
/// Configuration fields deserialize from YAML; the runtime fields below the
/// marker are populated by the execution engine only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the task set.
    #[serde(default)]
    pub id: TaskId,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// What kind of work this task performs.
    #[serde(rename = "type")]
    pub kind: TaskKind,

    /// Command string. Used verbatim as the program when `args` is present,
    /// whitespace-tokenized otherwise.
    #[serde(default)]
    pub command: String,

    /// Explicit argument list; bypasses command-string tokenization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Working directory override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Environment-variable overrides, merged over the inherited environment.
    #[serde(default, skip_serializing_if = "Environment::is_empty")]
    pub env: Environment,

    /// Per-attempt timeout in whole seconds; zero means no timeout.
    #[serde(default, with = "serde_duration")]
    pub timeout: Duration,

    /// Number of additional attempts after the first; zero means run once.
    #[serde(default)]
    pub retry_count: u32,

    /// Identifiers of tasks that must succeed before this one runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<TaskId>,

    // Runtime fields, owned by the execution engine.
    /// Current execution status.
    #[serde(skip)]
    pub status: TaskStatus,

    /// When the most recent attempt started.
    #[serde(skip)]
    pub started_at: Option<DateTime<Utc>>,

    /// When the most recent attempt finished.
    #[serde(skip)]
    pub finished_at: Option<DateTime<Utc>>,

    /// Combined output captured from the most recent attempt.
    #[serde(skip)]
    pub output: String,

    /// Error message from the most recent attempt, if any.
    #[serde(skip)]
    pub error: Option<String>,
}

impl Task {
    /// Create a task with the required fields; everything else defaults.
    pub fn new(
        id: impl Into<TaskId>,
        name: impl Into<String>,
        kind: TaskKind,
        command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            kind,
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: Environment::new(),
            timeout: Duration::ZERO,
            retry_count: 0,
            depends_on: Vec::new(),
            status: TaskStatus::Pending,
            started_at: None,
            finished_at: None,
            output: String::new(),
            error: None,
        }
    }

    /// Builder: set the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Builder: set the environment overrides.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Builder: set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set the retry count (additional attempts after the first).
    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Builder: set the dependency list.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check that the task configuration is well-formed.
    ///
    /// A task is valid iff identifier, name, and command are all non-empty.
    /// The type tag needs no check: [`TaskKind`] is a closed enum.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.command.is_empty() {
            return Err(ValidationError::MissingField("command"));
        }
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task[{}: {}]", self.id, self.name)
    }
}

/// Serde helper for Duration serialization.
///
/// Serializes Duration as whole seconds (matching the YAML config format).
pub(crate) mod serde_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_task() -> Task {
        Task::new("test-1", "Test Task", TaskKind::Command, "echo hello")
    }

    #[test]
    fn test_validate_accepts_well_formed_task() {
        assert!(valid_task().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_id() {
        let task = Task::new("", "Test Task", TaskKind::Command, "echo hello");
        assert_eq!(task.validate(), Err(ValidationError::MissingField("id")));
    }

    #[test]
    fn test_validate_rejects_missing_name() {
        let task = Task::new("test-1", "", TaskKind::Command, "echo hello");
        assert_eq!(task.validate(), Err(ValidationError::MissingField("name")));
    }

    #[test]
    fn test_validate_rejects_missing_command() {
        let task = Task::new("test-1", "Test Task", TaskKind::Command, "");
        assert_eq!(
            task.validate(),
            Err(ValidationError::MissingField("command"))
        );
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let task = Task::new("", "", TaskKind::Command, "");
        assert_eq!(task.validate(), Err(ValidationError::MissingField("id")));
    }

    #[test]
    fn test_builder_chaining() {
        let task = valid_task()
            .with_args(["-n", "1"])
            .with_working_dir("/tmp")
            .with_env(Environment::new().with_var("FOO", "bar"))
            .with_timeout(Duration::from_secs(30))
            .with_retries(2)
            .with_dependencies(["setup"])
            .with_description("prints a greeting");

        assert_eq!(task.args, vec!["-n", "1"]);
        assert_eq!(task.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(task.env.get("FOO"), Some("bar"));
        assert_eq!(task.timeout, Duration::from_secs(30));
        assert_eq!(task.retry_count, 2);
        assert_eq!(task.depends_on, vec![TaskId::new("setup")]);
        assert_eq!(task.description.as_deref(), Some("prints a greeting"));
    }

    #[test]
    fn test_new_task_starts_pending() {
        let task = valid_task();

        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.started_at.is_none());
        assert!(task.finished_at.is_none());
        assert!(task.output.is_empty());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_task_deserializes_from_yaml() {
        let yaml = r#"
id: fetch
name: Fetch data
type: command
command: curl
args: ["-s", "https://example.com"]
env:
  API_KEY: secret
timeout: 30
retry_count: 2
depends_on: [setup]
"#;
        let task: Task = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(task.id.as_str(), "fetch");
        assert_eq!(task.kind, TaskKind::Command);
        assert_eq!(task.args, vec!["-s", "https://example.com"]);
        assert_eq!(task.env.get("API_KEY"), Some("secret"));
        assert_eq!(task.timeout, Duration::from_secs(30));
        assert_eq!(task.retry_count, 2);
        assert_eq!(task.depends_on, vec![TaskId::new("setup")]);
        // Runtime fields are never read from configuration.
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn test_task_deserializes_with_minimal_fields() {
        let yaml = "id: t\nname: T\ntype: script\ncommand: ./run.sh\n";
        let task: Task = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(task.kind, TaskKind::Script);
        assert!(task.args.is_empty());
        assert_eq!(task.timeout, Duration::ZERO);
        assert_eq!(task.retry_count, 0);
        assert!(task.depends_on.is_empty());
    }

    #[test]
    fn test_unknown_type_tag_is_rejected() {
        let yaml = "id: t\nname: T\ntype: carrier-pigeon\ncommand: coo\n";
        assert!(serde_yaml::from_str::<Task>(yaml).is_err());
    }

    #[test]
    fn test_task_kind_display() {
        assert_eq!(TaskKind::Command.to_string(), "command");
        assert_eq!(TaskKind::Script.to_string(), "script");
        assert_eq!(TaskKind::Http.to_string(), "http");
    }

    #[test]
    fn test_task_status_display() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(TaskStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_task_display() {
        let task = valid_task();
        assert_eq!(task.to_string(), "Task[test-1: Test Task]");
    }
}
