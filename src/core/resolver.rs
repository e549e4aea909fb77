//! Dependency resolution for task execution order.
//!
//! Computes a total order over a task set such that every task appears after
//! all of its dependencies. The traversal is a depth-first walk seeded in
//! registration order, with three-state marking so a dependency cycle is
//! reported as an error instead of recursing forever.

use std::collections::HashMap;
use thiserror::Error;

use super::task::Task;
use super::types::TaskId;

/// Errors that can occur while building an execution order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A cycle was detected in the dependency graph.
    #[error("cycle detected involving task: {0}")]
    CycleDetected(TaskId),

    /// A dependency references a task that is not registered.
    #[error("missing dependency: task '{from}' depends on unknown task '{to}'")]
    MissingDependency { from: TaskId, to: TaskId },

    /// An identifier in the registration order has no registered task.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

/// Visit state for the depth-first traversal.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Compute an execution order over `tasks`.
///
/// `registration_order` supplies the enumeration the traversal is seeded
/// from, so the result is deterministic for a fixed registration order and
/// fixed dependency declarations. Every registered identifier appears in the
/// output exactly once, after all of its dependencies.
pub fn execution_order(
    tasks: &HashMap<TaskId, Task>,
    registration_order: &[TaskId],
) -> Result<Vec<TaskId>, ResolveError> {
    let mut marks: HashMap<TaskId, Mark> = HashMap::with_capacity(tasks.len());
    let mut order: Vec<TaskId> = Vec::with_capacity(tasks.len());

    for id in registration_order {
        visit(id, tasks, &mut marks, &mut order)?;
    }

    Ok(order)
}

fn visit(
    id: &TaskId,
    tasks: &HashMap<TaskId, Task>,
    marks: &mut HashMap<TaskId, Mark>,
    order: &mut Vec<TaskId>,
) -> Result<(), ResolveError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => return Err(ResolveError::CycleDetected(id.clone())),
        None => {}
    }

    let task = tasks
        .get(id)
        .ok_or_else(|| ResolveError::TaskNotFound(id.clone()))?;

    marks.insert(id.clone(), Mark::InProgress);

    for dep in &task.depends_on {
        if !tasks.contains_key(dep) {
            return Err(ResolveError::MissingDependency {
                from: id.clone(),
                to: dep.clone(),
            });
        }
        visit(dep, tasks, marks, order)?;
    }

    marks.insert(id.clone(), Mark::Done);
    order.push(id.clone());
    Ok(())
}
