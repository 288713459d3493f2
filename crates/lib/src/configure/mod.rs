//! Build configuration.
//!
//! The invocation controller populates its model through a
//! [`ConfigurationBuilder`]. The default implementation,
//! [`JsonConfigurationBuilder`], reads a JSON build file from the project
//! directory.

mod json;

use std::path::PathBuf;

use thiserror::Error;

use crate::model::{BuildModel, TaskPath};
use crate::params::StartParameters;

pub use json::JsonConfigurationBuilder;

/// Errors raised while populating a build model.
#[derive(Debug, Error)]
pub enum ConfigurationError {
  /// The build file does not exist.
  #[error("build file not found: {0}")]
  BuildFileNotFound(PathBuf),

  /// The build file could not be read.
  #[error("failed to read build file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The build file is not valid JSON or does not match the expected shape.
  #[error("failed to parse build file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A project or task name is empty or contains a path separator.
  #[error("invalid {kind} name '{name}'")]
  InvalidName { kind: &'static str, name: String },

  /// A task depends on a task that no project declares.
  #[error("task {task} depends on unknown task '{dependency}'")]
  UnknownDependency { task: TaskPath, dependency: String },

  /// Failure reported by a custom configuration builder.
  #[error("{0}")]
  Custom(String),
}

/// Populates the build model for an invocation.
pub trait ConfigurationBuilder {
  /// Build a fully populated model from the invocation's start parameters.
  fn populate(&self, params: &StartParameters) -> Result<BuildModel, ConfigurationError>;
}
