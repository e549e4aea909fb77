//! Execution: the engine that drives tasks and the process adapter it calls.

pub mod executor;
pub mod process;

pub use executor::{Executor, ExecutorError, TaskResult};
pub use process::{InvokeError, ProcessOutput};
