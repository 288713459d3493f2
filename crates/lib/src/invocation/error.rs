//! Error taxonomy for build invocations.

use std::fmt;

use thiserror::Error;

use crate::configure::ConfigurationError;
use crate::execute::{GraphError, TaskFailure};

use super::phase::{Operation, Phase};

/// An operation was attempted in a phase that does not allow it.
///
/// Always a programming error in the caller; never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} while the invocation is {phase}")]
pub struct IllegalStateError {
  pub operation: Operation,
  pub phase: Phase,
}

/// One or more tasks failed during execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} task(s) failed: {}", .failures.len(), join(.failures))]
pub struct TaskExecutionFailure {
  pub failures: Vec<TaskFailure>,
}

/// Error returned by a completion hook.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
  #[error("{0}")]
  Failed(String),

  #[error("panicked: {0}")]
  Panicked(String),
}

impl HookError {
  pub fn msg(message: impl fmt::Display) -> Self {
    HookError::Failed(message.to_string())
  }
}

/// A completion hook that failed, identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("completion hook '{hook}' failed: {cause}")]
pub struct HookFailure {
  pub hook: String,
  pub cause: HookError,
}

/// Why a build did not succeed.
#[derive(Debug, Error)]
pub enum BuildFailure {
  /// The configuration builder failed.
  #[error("configuration failed: {0}")]
  Configuration(#[from] ConfigurationError),

  /// The task graph could not be built from the model.
  #[error("task graph could not be built: {0}")]
  TaskGraph(#[from] GraphError),

  /// One or more tasks failed.
  #[error(transparent)]
  TaskExecution(#[from] TaskExecutionFailure),

  /// The transport requested cancellation.
  #[error("build cancelled")]
  Cancelled,

  /// A collaborator panicked, or the controller hit an impossible state.
  #[error("internal fault while {phase}: {message}")]
  Internal { phase: Phase, message: String },

  /// Completion hooks failed; `outcome` is the failure the build had before them, if any.
  #[error("{}", describe_hooks(.outcome.as_deref(), .failures))]
  Hooks {
    outcome: Option<Box<BuildFailure>>,
    failures: Vec<HookFailure>,
  },
}

impl BuildFailure {
  /// The failure of the build itself, looking through hook failures.
  pub fn primary(&self) -> Option<&BuildFailure> {
    match self {
      BuildFailure::Hooks { outcome, .. } => outcome.as_deref(),
      other => Some(other),
    }
  }

  /// Failed tasks, if the build failed during task execution.
  pub fn task_failures(&self) -> &[TaskFailure] {
    match self.primary() {
      Some(BuildFailure::TaskExecution(failure)) => &failure.failures,
      _ => &[],
    }
  }

  pub fn hook_failures(&self) -> &[HookFailure] {
    match self {
      BuildFailure::Hooks { failures, .. } => failures,
      _ => &[],
    }
  }

  pub fn is_configuration(&self) -> bool {
    matches!(self.primary(), Some(BuildFailure::Configuration(_)))
  }
}

impl From<IllegalStateError> for BuildFailure {
  fn from(err: IllegalStateError) -> Self {
    BuildFailure::Internal {
      phase: err.phase,
      message: err.to_string(),
    }
  }
}

/// Error returned by `configure()` and `run()`.
#[derive(Debug, Error)]
pub enum InvocationError {
  /// The call itself was illegal; nothing ran.
  #[error(transparent)]
  IllegalState(#[from] IllegalStateError),

  /// The build ran and failed. Completion hooks have already run.
  #[error(transparent)]
  Build(#[from] BuildFailure),
}

impl InvocationError {
  pub fn build_failure(&self) -> Option<&BuildFailure> {
    match self {
      InvocationError::Build(failure) => Some(failure),
      InvocationError::IllegalState(_) => None,
    }
  }

  pub fn is_illegal_state(&self) -> bool {
    matches!(self, InvocationError::IllegalState(_))
  }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
  items.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

fn describe_hooks(outcome: Option<&BuildFailure>, failures: &[HookFailure]) -> String {
  match outcome {
    Some(outcome) => format!(
      "{}; additionally {} completion hook(s) failed: {}",
      outcome,
      failures.len(),
      join(failures)
    ),
    None => format!("{} completion hook(s) failed: {}", failures.len(), join(failures)),
  }
}
