//! Core identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a task within a task set.
///
/// The default value is the empty string, which never validates; it exists so
/// that configuration-level validation can name the missing field instead of
/// failing at the serde boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new TaskId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_creation() {
        let task_id = TaskId::new("build");
        assert_eq!(task_id.as_str(), "build");
        assert!(!task_id.is_empty());
    }

    #[test]
    fn test_task_id_display() {
        let task_id = TaskId::new("deploy");
        assert_eq!(format!("{}", task_id), "deploy");
    }

    #[test]
    fn test_task_id_equality() {
        let id1 = TaskId::new("task_a");
        let id2 = TaskId::new("task_a");
        let id3 = TaskId::new("task_b");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_ids_are_hashable() {
        use std::collections::HashSet;

        let mut ids: HashSet<TaskId> = HashSet::new();
        ids.insert(TaskId::new("task1"));
        ids.insert(TaskId::new("task2"));
        ids.insert(TaskId::new("task1")); // duplicate

        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_task_id_from_str() {
        let id1: TaskId = "my_task".into();
        let id2 = TaskId::new("my_task");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_task_id_serializes_as_plain_string() {
        let id = TaskId::new("compile");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"compile\"");
    }
}
