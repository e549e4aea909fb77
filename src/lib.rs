pub mod config;
pub mod core;
pub mod execution;

pub use config::{Config, ConfigError, Defaults};
pub use core::environment::Environment;
pub use core::resolver::{execution_order, ResolveError};
pub use core::task::{Task, TaskKind, TaskStatus, ValidationError};
pub use core::types::TaskId;
pub use execution::executor::{Executor, ExecutorError, TaskResult};
pub use execution::process::{InvokeError, ProcessOutput};
