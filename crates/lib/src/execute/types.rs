//! Types for task graph construction and execution.
//!
//! This module defines the error types, result types, and configuration
//! shared by graph builders and executors.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::model::TaskPath;
use crate::params::{CancellationToken, StartParameters};

/// Errors that can occur while building a task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
  /// A requested task selector matched no task.
  #[error("task '{0}' not found in any project")]
  TaskNotFound(String),

  /// Cycle detected in the task dependencies.
  #[error("dependency cycle detected involving {0}")]
  CycleDetected(TaskPath),

  /// No tasks were requested and the build declares no default tasks.
  #[error("no tasks requested and no default tasks declared")]
  NothingToRun,
}

/// Why a single task failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// Command could not be started.
  #[error("failed to start command '{cmd}': {message}")]
  Spawn { cmd: String, message: String },

  /// The task's worker panicked.
  #[error("task panicked: {0}")]
  Panicked(String),
}

/// A task that failed, together with its cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
  pub task: TaskPath,
  pub cause: TaskError,
}

impl fmt::Display for TaskFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.task, self.cause)
  }
}

/// Identifies why a task was not executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  /// A dependency failed or was itself skipped.
  FailedDependency(TaskPath),
  /// Execution stopped after an earlier failure.
  Stopped,
  /// The build was cancelled before the task's wave started.
  Cancelled,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::FailedDependency(path) => write!(f, "dependency {} failed", path),
      SkipReason::Stopped => f.write_str("build stopped after failure"),
      SkipReason::Cancelled => f.write_str("build cancelled"),
    }
  }
}

/// Aggregated result of executing a task graph.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
  /// Tasks that completed successfully, in completion order.
  pub succeeded: Vec<TaskPath>,

  /// Tasks that failed, in completion order.
  pub failed: Vec<TaskFailure>,

  /// Tasks that never ran, with the reason.
  pub skipped: BTreeMap<TaskPath, SkipReason>,

  /// Wall time spent executing.
  pub duration: Duration,
}

impl ExecutionResult {
  /// Returns true if no task failed or was skipped.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  pub fn failures(&self) -> &[TaskFailure] {
    &self.failed
  }

  /// Returns the total number of tasks accounted for.
  pub fn total(&self) -> usize {
    self.succeeded.len() + self.failed.len() + self.skipped.len()
  }
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of tasks to execute in parallel.
  pub parallelism: usize,

  /// Keep running independent tasks after a failure.
  pub continue_on_failure: bool,

  /// Shell to use for task commands.
  /// If None, uses /bin/sh (Unix) or powershell.exe (Windows).
  pub shell: Option<String>,

  /// Checked before each wave; once set, no further wave starts.
  pub cancellation: CancellationToken,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4),
      continue_on_failure: false,
      shell: None,
      cancellation: CancellationToken::new(),
    }
  }
}

impl From<&StartParameters> for ExecuteConfig {
  fn from(params: &StartParameters) -> Self {
    Self {
      parallelism: params.parallelism.max(1),
      continue_on_failure: params.continue_on_failure,
      shell: params.shell.clone(),
      cancellation: params.cancellation.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_result_is_success() {
    let result = ExecutionResult::default();
    assert!(result.is_success());
    assert_eq!(result.total(), 0);
  }

  #[test]
  fn failed_task_makes_result_unsuccessful() {
    let result = ExecutionResult {
      succeeded: vec![TaskPath::new("lib", "build")],
      failed: vec![TaskFailure {
        task: TaskPath::new("app", "build"),
        cause: TaskError::CmdFailed {
          cmd: "make".to_string(),
          code: Some(2),
        },
      }],
      ..Default::default()
    };
    assert!(!result.is_success());
    assert_eq!(result.total(), 2);
    assert_eq!(
      result.failures()[0].to_string(),
      "app:build: command failed with exit code Some(2): make"
    );
  }

  #[test]
  fn skipped_task_makes_result_unsuccessful() {
    let mut result = ExecutionResult::default();
    result.skipped.insert(
      TaskPath::new("app", "test"),
      SkipReason::FailedDependency(TaskPath::new("app", "build")),
    );
    assert!(!result.is_success());
    assert_eq!(
      result.skipped[&TaskPath::new("app", "test")].to_string(),
      "dependency app:build failed"
    );
  }

  #[test]
  fn config_from_params() {
    let mut params = StartParameters::new("/work");
    params.parallelism = 0;
    params.continue_on_failure = true;
    params.shell = Some("/bin/bash".to_string());

    let config = ExecuteConfig::from(&params);
    assert_eq!(config.parallelism, 1);
    assert!(config.continue_on_failure);
    assert_eq!(config.shell.as_deref(), Some("/bin/bash"));

    params.cancellation.cancel();
    assert!(config.cancellation.is_cancelled(), "token is shared with the parameters");
  }
}
