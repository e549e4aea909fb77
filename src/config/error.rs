//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::task::ValidationError;
use crate::core::types::TaskId;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read file '{path}': {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the configuration file.
    #[error("failed to write file '{path}': {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML from a specific file.
    #[error("YAML parse error in '{path}': {source}")]
    YamlFileError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to serialize configuration to YAML.
    #[error("YAML serialize error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Missing required document field.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The document defines no tasks.
    #[error("at least one task is required")]
    NoTasks,

    /// A task definition failed validation.
    #[error("task '{id}': {source}")]
    InvalidTask {
        id: TaskId,
        #[source]
        source: ValidationError,
    },

    /// Two task definitions share an identifier.
    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    /// A task depends on an identifier with no definition.
    #[error("task '{id}' depends on unknown task '{dependency}'")]
    UnknownDependency { id: TaskId, dependency: TaskId },
}
