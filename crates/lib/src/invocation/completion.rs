//! Completion hooks and the sequencer that runs them.
//!
//! Hooks are bound to one controller and run once when its build finishes,
//! whatever the outcome. A failing hook never stops the hooks after it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tracing::{debug, warn};

use crate::execute::ExecutionResult;
use crate::model::BuildModel;
use crate::params::BuildAction;

use super::error::{BuildFailure, HookError, HookFailure};

/// Final result of a build before completion hooks ran.
#[derive(Debug)]
pub enum Outcome {
  Success,
  Failed(BuildFailure),
}

impl Outcome {
  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success)
  }

  pub fn failure(&self) -> Option<&BuildFailure> {
    match self {
      Outcome::Success => None,
      Outcome::Failed(failure) => Some(failure),
    }
  }

  /// Fold hook failures into the outcome.
  ///
  /// Without hook failures the outcome is returned as is. Otherwise the
  /// result is a composite failure keeping the original failure, if any.
  pub fn with_hook_failures(self, failures: Vec<HookFailure>) -> Result<(), BuildFailure> {
    match (self, failures.is_empty()) {
      (Outcome::Success, true) => Ok(()),
      (Outcome::Failed(failure), true) => Err(failure),
      (outcome, false) => Err(BuildFailure::Hooks {
        outcome: match outcome {
          Outcome::Success => None,
          Outcome::Failed(failure) => Some(Box::new(failure)),
        },
        failures,
      }),
    }
  }
}

impl From<Result<(), BuildFailure>> for Outcome {
  fn from(result: Result<(), BuildFailure>) -> Self {
    match result {
      Ok(()) => Outcome::Success,
      Err(failure) => Outcome::Failed(failure),
    }
  }
}

/// What a completion hook gets to see of the finishing build.
#[derive(Debug, Clone, Copy)]
pub struct FinishedBuild<'a> {
  pub action: BuildAction,
  pub outcome: &'a Outcome,

  /// The model, unless configuration failed before producing one.
  pub model: Option<&'a BuildModel>,

  /// Task results, if execution ran.
  pub execution: Option<&'a ExecutionResult>,

  /// Time since the invocation started.
  pub elapsed: Duration,
}

/// Callback notified when a build finishes.
pub trait CompletionHook {
  /// Name used in logs and failure reports.
  fn name(&self) -> &str;

  fn on_finished(&self, build: &FinishedBuild<'_>) -> Result<(), HookError>;
}

/// A [`CompletionHook`] backed by a closure. Created with [`hook_fn`].
pub struct FnHook<F> {
  name: String,
  f: F,
}

/// Wrap a closure as a named completion hook.
pub fn hook_fn<F>(name: impl Into<String>, f: F) -> FnHook<F>
where
  F: Fn(&FinishedBuild<'_>) -> Result<(), HookError>,
{
  FnHook { name: name.into(), f }
}

impl<F> CompletionHook for FnHook<F>
where
  F: Fn(&FinishedBuild<'_>) -> Result<(), HookError>,
{
  fn name(&self) -> &str {
    &self.name
  }

  fn on_finished(&self, build: &FinishedBuild<'_>) -> Result<(), HookError> {
    (self.f)(build)
  }
}

/// Ordered set of completion hooks for one invocation.
#[derive(Default)]
pub struct CompletionSequencer {
  hooks: Vec<Box<dyn CompletionHook>>,
}

impl CompletionSequencer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, hook: Box<dyn CompletionHook>) {
    debug!(hook = hook.name(), position = self.hooks.len(), "registered completion hook");
    self.hooks.push(hook);
  }

  pub fn len(&self) -> usize {
    self.hooks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hooks.is_empty()
  }

  /// Run every hook once, in registration order.
  ///
  /// Consumes the sequencer so hooks can never run twice. Errors and panics
  /// from a hook are collected and returned; they do not stop later hooks.
  pub fn finish(self, build: &FinishedBuild<'_>) -> Vec<HookFailure> {
    let mut failures = Vec::new();

    for hook in self.hooks {
      debug!(hook = hook.name(), "running completion hook");
      let cause = match catch_fault(|| hook.on_finished(build)) {
        Ok(Ok(())) => continue,
        Ok(Err(err)) => err,
        Err(message) => HookError::Panicked(message),
      };
      warn!(hook = hook.name(), error = %cause, "completion hook failed");
      failures.push(HookFailure {
        hook: hook.name().to_string(),
        cause,
      });
    }

    failures
  }
}

/// Run `f`, turning a panic into its message.
pub(crate) fn catch_fault<T>(f: impl FnOnce() -> T) -> Result<T, String> {
  catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  use tracing_test::traced_test;

  fn build(outcome: &Outcome) -> FinishedBuild<'_> {
    FinishedBuild {
      action: BuildAction::Run,
      outcome,
      model: None,
      execution: None,
      elapsed: Duration::ZERO,
    }
  }

  fn recording(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn CompletionHook> {
    let log = log.clone();
    let label = name.to_string();
    Box::new(hook_fn(name, move |_| {
      log.borrow_mut().push(label.clone());
      Ok(())
    }))
  }

  #[test]
  fn hooks_run_in_registration_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut sequencer = CompletionSequencer::new();
    for name in ["first", "second", "third"] {
      sequencer.register(recording(name, &log));
    }
    assert_eq!(sequencer.len(), 3);

    let failures = sequencer.finish(&build(&Outcome::Success));

    assert!(failures.is_empty());
    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
  }

  #[test]
  #[traced_test]
  fn failing_and_panicking_hooks_do_not_stop_the_rest() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut sequencer = CompletionSequencer::new();
    sequencer.register(Box::new(hook_fn("refuses", |_| Err(HookError::msg("disk full")))));
    sequencer.register(Box::new(hook_fn("explodes", |_| panic!("hook blew up"))));
    sequencer.register(recording("last", &log));

    let failures = sequencer.finish(&build(&Outcome::Success));

    assert_eq!(*log.borrow(), vec!["last"]);
    assert_eq!(
      failures,
      vec![
        HookFailure {
          hook: "refuses".to_string(),
          cause: HookError::Failed("disk full".to_string()),
        },
        HookFailure {
          hook: "explodes".to_string(),
          cause: HookError::Panicked("hook blew up".to_string()),
        },
      ]
    );
    assert!(logs_contain("completion hook failed"));
  }

  #[test]
  fn hooks_see_the_outcome() {
    let seen = Rc::new(RefCell::new(None));
    let seen_in_hook = seen.clone();
    let mut sequencer = CompletionSequencer::new();
    sequencer.register(Box::new(hook_fn("observer", move |build| {
      *seen_in_hook.borrow_mut() = Some(build.outcome.is_success());
      Ok(())
    })));

    let outcome = Outcome::Failed(BuildFailure::Cancelled);
    sequencer.finish(&build(&outcome));

    assert_eq!(*seen.borrow(), Some(false));
  }

  #[test]
  fn with_hook_failures_composes() {
    let hook_failure = || HookFailure {
      hook: "h".to_string(),
      cause: HookError::msg("x"),
    };

    assert!(Outcome::Success.with_hook_failures(vec![]).is_ok());
    assert!(matches!(
      Outcome::Failed(BuildFailure::Cancelled).with_hook_failures(vec![]),
      Err(BuildFailure::Cancelled)
    ));
    match Outcome::Success.with_hook_failures(vec![hook_failure()]) {
      Err(BuildFailure::Hooks { outcome: None, failures }) => assert_eq!(failures.len(), 1),
      other => panic!("unexpected: {other:?}"),
    }
    match Outcome::Failed(BuildFailure::Cancelled).with_hook_failures(vec![hook_failure()]) {
      Err(BuildFailure::Hooks { outcome: Some(outcome), .. }) => {
        assert!(matches!(*outcome, BuildFailure::Cancelled))
      }
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn catch_fault_extracts_messages() {
    assert_eq!(catch_fault(|| 7), Ok(7));
    assert_eq!(catch_fault(|| -> () { panic!("static") }), Err("static".to_string()));
    let code = 3;
    assert_eq!(
      catch_fault(|| -> () { panic!("formatted {}", code) }),
      Err("formatted 3".to_string())
    );
  }
}
