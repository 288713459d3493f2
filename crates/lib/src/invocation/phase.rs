//! Invocation phases and the guard deciding what is legal in each.
//!
//! Every legality question about an invocation is answered here: which
//! public operation may be called in which phase, and which phase may follow
//! which. Nothing else in the crate compares phases directly.

use std::fmt;

use serde::Serialize;

/// Stage of a build invocation. Phases only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
  NotStarted,
  Configuring,
  Configured,
  Running,
  Finishing,
  Finished,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Phase::NotStarted => "not-started",
      Phase::Configuring => "configuring",
      Phase::Configured => "configured",
      Phase::Running => "running",
      Phase::Finishing => "finishing",
      Phase::Finished => "finished",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Phase::Finished)
  }

  /// Whether `operation` may be invoked while in this phase.
  pub fn permits(self, operation: Operation) -> bool {
    match operation {
      Operation::Configure | Operation::Run | Operation::RegisterHook => self == Phase::NotStarted,
      Operation::ReadModel => matches!(self, Phase::Configured | Phase::Running | Phase::Finishing),
      Operation::Advance(next) => self.can_advance_to(next),
    }
  }

  /// Whether `next` may directly follow this phase.
  pub fn can_advance_to(self, next: Phase) -> bool {
    matches!(
      (self, next),
      (Phase::NotStarted, Phase::Configuring)
        | (Phase::Configuring, Phase::Configured)
        | (Phase::Configuring, Phase::Finishing)
        | (Phase::Configured, Phase::Running)
        | (Phase::Configured, Phase::Finishing)
        | (Phase::Running, Phase::Finishing)
        | (Phase::Finishing, Phase::Finished)
    )
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Something a caller, or the controller itself, attempts on an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  Configure,
  Run,
  ReadModel,
  RegisterHook,
  /// Internal move to the given phase.
  Advance(Phase),
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::Configure => f.write_str("configure"),
      Operation::Run => f.write_str("run"),
      Operation::ReadModel => f.write_str("read the model"),
      Operation::RegisterHook => f.write_str("register a completion hook"),
      Operation::Advance(next) => write!(f, "move to {}", next),
    }
  }
}
