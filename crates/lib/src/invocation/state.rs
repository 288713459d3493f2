//! Mutable state of one invocation.

use tracing::debug;

use crate::execute::ExecutionResult;
use crate::model::BuildModel;

use super::error::IllegalStateError;
use super::phase::{Operation, Phase};

/// Phase, model and execution result of one invocation.
///
/// Every read and every transition is validated against [`Phase`]; callers
/// never inspect the phase to decide legality themselves.
#[derive(Debug)]
pub struct InvocationState {
  phase: Phase,
  model: Option<BuildModel>,
  execution: Option<ExecutionResult>,
}

impl Default for InvocationState {
  fn default() -> Self {
    Self::new()
  }
}

impl InvocationState {
  pub fn new() -> Self {
    Self {
      phase: Phase::NotStarted,
      model: None,
      execution: None,
    }
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  /// Fail unless `operation` is legal in the current phase.
  pub fn check(&self, operation: Operation) -> Result<(), IllegalStateError> {
    if self.phase.permits(operation) {
      Ok(())
    } else {
      Err(IllegalStateError {
        operation,
        phase: self.phase,
      })
    }
  }

  /// Move to `next`. The phase is left unchanged if the move is illegal.
  pub fn advance(&mut self, next: Phase) -> Result<(), IllegalStateError> {
    self.check(Operation::Advance(next))?;
    debug!(from = %self.phase, to = %next, "phase transition");
    self.phase = next;
    Ok(())
  }

  pub fn model(&self) -> Result<&BuildModel, IllegalStateError> {
    self.check(Operation::ReadModel)?;
    self.model.as_ref().ok_or(IllegalStateError {
      operation: Operation::ReadModel,
      phase: self.phase,
    })
  }

  pub fn model_mut(&mut self) -> Result<&mut BuildModel, IllegalStateError> {
    self.check(Operation::ReadModel)?;
    let phase = self.phase;
    self.model.as_mut().ok_or(IllegalStateError {
      operation: Operation::ReadModel,
      phase,
    })
  }

  /// Store the freshly populated model. Only legal while configuring.
  pub(crate) fn populate(&mut self, model: BuildModel) -> Result<(), IllegalStateError> {
    if self.phase != Phase::Configuring || self.model.is_some() {
      return Err(IllegalStateError {
        operation: Operation::Advance(Phase::Configured),
        phase: self.phase,
      });
    }
    self.model = Some(model);
    Ok(())
  }

  pub(crate) fn record_execution(&mut self, execution: ExecutionResult) {
    self.execution = Some(execution);
  }

  pub fn execution(&self) -> Option<&ExecutionResult> {
    self.execution.as_ref()
  }
}
