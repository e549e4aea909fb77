//! YAML task-file parsing.
//!
//! A task file carries a version string, a defaults section applied to any
//! task field left unset, and an ordered list of task definitions:
//!
//! ```yaml
//! version: "1.0"
//! defaults:
//!   timeout: 30
//!   retry_count: 0
//! tasks:
//!   - id: build
//!     name: Build
//!     type: command
//!     command: cargo build
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::task::{serde_duration, Task, TaskKind};
use crate::core::types::TaskId;

use super::error::ConfigError;

/// Default values applied to task fields left unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Default per-attempt timeout in whole seconds; zero means none.
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
    /// Default retry count.
    pub retry_count: u32,
    /// Default working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// A task configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document format version.
    pub version: String,
    /// Defaults applied to any task field left unset.
    pub defaults: Defaults,
    /// Ordered task definitions.
    pub tasks: Vec<Task>,
}

impl Config {
    /// Load a task file, applying defaults to the parsed tasks.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::FileReadError {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut config: Config =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlFileError {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_defaults();
        Ok(config)
    }

    /// Save the document as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::FileWriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fill unset task fields from the defaults section.
    fn apply_defaults(&mut self) {
        for task in &mut self.tasks {
            if task.timeout.is_zero() && !self.defaults.timeout.is_zero() {
                task.timeout = self.defaults.timeout;
            }
            if task.retry_count == 0 && self.defaults.retry_count > 0 {
                task.retry_count = self.defaults.retry_count;
            }
            if task.working_dir.is_none() {
                task.working_dir.clone_from(&self.defaults.working_dir);
            }
        }
    }

    /// Validate the whole document, reporting the first offender in
    /// definition order: version present, at least one task, every task
    /// well-formed, no duplicate identifiers, every dependency defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::MissingField("version"));
        }
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        let mut seen: HashSet<&TaskId> = HashSet::new();
        for task in &self.tasks {
            task.validate().map_err(|source| ConfigError::InvalidTask {
                id: task.id.clone(),
                source,
            })?;
            if !seen.insert(&task.id) {
                return Err(ConfigError::DuplicateTask(task.id.clone()));
            }
        }

        for task in &self.tasks {
            for dep in &task.depends_on {
                if !seen.contains(dep) {
                    return Err(ConfigError::UnknownDependency {
                        id: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// A starter document, optionally populated with example tasks.
    pub fn example(with_tasks: bool) -> Self {
        let tasks = if with_tasks {
            vec![
                Task::new("hello", "Hello World", TaskKind::Command, "echo")
                    .with_args(["Hello from tusk!"])
                    .with_description("Print a simple greeting"),
                Task::new("date", "Show Date", TaskKind::Command, "date")
                    .with_description("Display current date and time"),
                Task::new("list-files", "List Files", TaskKind::Command, "ls -la")
                    .with_description("List files in the current directory")
                    .with_dependencies(["hello"]),
            ]
        } else {
            Vec::new()
        };

        Self {
            version: "1.0".to_string(),
            defaults: Defaults {
                timeout: Duration::from_secs(30),
                retry_count: 0,
                working_dir: None,
            },
            tasks,
        }
    }
}
