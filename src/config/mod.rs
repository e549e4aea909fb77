//! Task-file configuration: YAML loading, saving, and validation.

pub mod error;
pub mod yaml;

pub use error::ConfigError;
pub use yaml::{Config, Defaults};
