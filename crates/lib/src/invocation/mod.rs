//! Build invocation lifecycle.
//!
//! A [`BuildController`] owns exactly one build request. The caller invokes
//! either [`BuildController::configure`] or [`BuildController::run`], once.
//! The controller then:
//! 1. Populates the model through the configuration builder
//! 2. For `run`, builds the task graph and executes it
//! 3. Runs every completion hook, in registration order
//!
//! Step 3 happens on every path: success, configuration failure, task
//! failure, cancellation and collaborator panics. Cancellation is observed
//! before configuration, before execution and once execution returns. When `configure`/`run`
//! return, all hooks have completed.
//!
//! ```text
//! NotStarted -> Configuring -> Configured -> Running -> Finishing -> Finished
//!                    |              |                       ^
//!                    |              +-- configure() --------+
//!                    +------------- configuration failed ---+
//! ```

pub mod completion;
pub mod error;
pub mod phase;
pub mod state;

use std::time::Instant;

use tracing::{error, info};

use crate::configure::{ConfigurationBuilder, JsonConfigurationBuilder};
use crate::execute::{DefaultGraphBuilder, ExecuteConfig, ExecutionResult, ShellExecutor, TaskGraphBuilder, TaskGraphExecutor};
use crate::model::BuildModel;
use crate::params::{BuildAction, StartParameters};

use completion::catch_fault;

pub use completion::{CompletionHook, CompletionSequencer, FinishedBuild, FnHook, Outcome, hook_fn};
pub use error::{BuildFailure, HookError, HookFailure, IllegalStateError, InvocationError, TaskExecutionFailure};
pub use phase::{Operation, Phase};
pub use state::InvocationState;

/// Controls a single build invocation.
///
/// Not reusable: once finished, every further call fails with
/// [`IllegalStateError`]. Create a new controller per build request.
pub struct BuildController {
  params: StartParameters,
  configuration: Box<dyn ConfigurationBuilder>,
  graph_builder: Box<dyn TaskGraphBuilder>,
  executor: Box<dyn TaskGraphExecutor>,
  sequencer: CompletionSequencer,
  state: InvocationState,
}

impl BuildController {
  pub fn new(
    params: StartParameters,
    configuration: Box<dyn ConfigurationBuilder>,
    graph_builder: Box<dyn TaskGraphBuilder>,
    executor: Box<dyn TaskGraphExecutor>,
  ) -> Self {
    Self {
      params,
      configuration,
      graph_builder,
      executor,
      sequencer: CompletionSequencer::new(),
      state: InvocationState::new(),
    }
  }

  pub fn builder(params: StartParameters) -> BuildControllerBuilder {
    BuildControllerBuilder::new(params)
  }

  pub fn params(&self) -> &StartParameters {
    &self.params
  }

  pub fn phase(&self) -> Phase {
    self.state.phase()
  }

  /// Register a hook to run when the build finishes. Only legal before the build starts.
  pub fn add_hook(&mut self, hook: impl CompletionHook + 'static) -> Result<(), IllegalStateError> {
    self.state.check(Operation::RegisterHook)?;
    self.sequencer.register(Box::new(hook));
    Ok(())
  }

  /// The configured model.
  ///
  /// Readable while configured, running or finishing; never before
  /// configuration completed and never after the invocation finished.
  pub fn model(&self) -> Result<&BuildModel, IllegalStateError> {
    self.state.model()
  }

  pub fn model_mut(&mut self) -> Result<&mut BuildModel, IllegalStateError> {
    self.state.model_mut()
  }

  /// Configure the build without scheduling or running tasks, then finish it.
  pub fn configure(&mut self) -> Result<(), InvocationError> {
    self.state.check(Operation::Configure)?;
    self.invoke(BuildAction::Configure)
  }

  /// Configure the build, execute the requested tasks, then finish it.
  pub fn run(&mut self) -> Result<(), InvocationError> {
    self.state.check(Operation::Run)?;
    self.invoke(BuildAction::Run)
  }

  fn invoke(&mut self, action: BuildAction) -> Result<(), InvocationError> {
    let started = Instant::now();
    info!(
      action = %action,
      project_dir = %self.params.project_dir.display(),
      "build invocation started"
    );

    let outcome = Outcome::from(self.drive(action));
    self.finish(action, outcome, started)
  }

  /// Configuration and, for `run`, execution. Any failure ends here.
  fn drive(&mut self, action: BuildAction) -> Result<(), BuildFailure> {
    self.state.advance(Phase::Configuring)?;
    self.configure_model()?;

    if action == BuildAction::Run {
      self.execute_tasks()?;
    }
    Ok(())
  }

  fn configure_model(&mut self) -> Result<(), BuildFailure> {
    self.ensure_not_cancelled()?;

    let configuration = &self.configuration;
    let params = &self.params;
    let model = catch_fault(|| configuration.populate(params)).map_err(|message| BuildFailure::Internal {
      phase: Phase::Configuring,
      message,
    })??;

    info!(
      projects = model.projects.len(),
      tasks = model.task_count(),
      "build configured"
    );
    self.state.populate(model)?;
    self.state.advance(Phase::Configured)?;
    Ok(())
  }

  fn execute_tasks(&mut self) -> Result<(), BuildFailure> {
    self.ensure_not_cancelled()?;
    self.state.advance(Phase::Running)?;

    let model = self.state.model()?;
    let graph_builder = &self.graph_builder;
    let graph = catch_fault(|| graph_builder.build(model)).map_err(|message| BuildFailure::Internal {
      phase: Phase::Running,
      message,
    })??;
    info!(tasks = graph.len(), "task graph ready");

    let executor = &self.executor;
    let execution: ExecutionResult =
      catch_fault(|| executor.execute(&graph)).map_err(|message| BuildFailure::Internal {
        phase: Phase::Running,
        message,
      })?;

    let failures = execution.failed.clone();
    self.state.record_execution(execution);

    // Tasks that never started because of an interrupt are not a success,
    // even if every task that did run passed.
    self.ensure_not_cancelled()?;

    if failures.is_empty() {
      Ok(())
    } else {
      Err(TaskExecutionFailure { failures }.into())
    }
  }

  fn ensure_not_cancelled(&self) -> Result<(), BuildFailure> {
    if self.params.cancellation.is_cancelled() {
      info!(phase = %self.state.phase(), "cancellation requested");
      return Err(BuildFailure::Cancelled);
    }
    Ok(())
  }

  /// Run the completion hooks and reach `Finished`.
  fn finish(&mut self, action: BuildAction, outcome: Outcome, started: Instant) -> Result<(), InvocationError> {
    self.state.advance(Phase::Finishing)?;

    if let Some(failure) = outcome.failure() {
      error!(action = %action, error = %failure, "build failed");
    }

    let sequencer = std::mem::take(&mut self.sequencer);
    let hook_count = sequencer.len();
    let hook_failures = sequencer.finish(&FinishedBuild {
      action,
      outcome: &outcome,
      model: self.state.model().ok(),
      execution: self.state.execution(),
      elapsed: started.elapsed(),
    });

    self.state.advance(Phase::Finished)?;

    let success = outcome.is_success() && hook_failures.is_empty();
    info!(
      action = %action,
      success,
      hooks = hook_count,
      hook_failures = hook_failures.len(),
      elapsed = ?started.elapsed(),
      "build invocation finished"
    );

    outcome.with_hook_failures(hook_failures)?;
    Ok(())
  }
}

/// Assembles a [`BuildController`], defaulting each collaborator.
///
/// Defaults: [`JsonConfigurationBuilder`], [`DefaultGraphBuilder`] and a
/// [`ShellExecutor`] configured from the start parameters.
pub struct BuildControllerBuilder {
  params: StartParameters,
  configuration: Option<Box<dyn ConfigurationBuilder>>,
  graph_builder: Option<Box<dyn TaskGraphBuilder>>,
  executor: Option<Box<dyn TaskGraphExecutor>>,
  sequencer: CompletionSequencer,
}

impl BuildControllerBuilder {
  pub fn new(params: StartParameters) -> Self {
    Self {
      params,
      configuration: None,
      graph_builder: None,
      executor: None,
      sequencer: CompletionSequencer::new(),
    }
  }

  pub fn configuration(mut self, configuration: impl ConfigurationBuilder + 'static) -> Self {
    self.configuration = Some(Box::new(configuration));
    self
  }

  pub fn graph_builder(mut self, graph_builder: impl TaskGraphBuilder + 'static) -> Self {
    self.graph_builder = Some(Box::new(graph_builder));
    self
  }

  pub fn executor(mut self, executor: impl TaskGraphExecutor + 'static) -> Self {
    self.executor = Some(Box::new(executor));
    self
  }

  /// Register a completion hook. Hooks run in the order they are added.
  pub fn hook(mut self, hook: impl CompletionHook + 'static) -> Self {
    self.sequencer.register(Box::new(hook));
    self
  }

  /// Fails only if the default executor's runtime cannot be created.
  pub fn build(self) -> std::io::Result<BuildController> {
    let executor: Box<dyn TaskGraphExecutor> = match self.executor {
      Some(executor) => executor,
      None => Box::new(ShellExecutor::new(ExecuteConfig::from(&self.params))?),
    };

    Ok(BuildController {
      configuration: self
        .configuration
        .unwrap_or_else(|| Box::new(JsonConfigurationBuilder::new())),
      graph_builder: self.graph_builder.unwrap_or_else(|| Box::new(DefaultGraphBuilder)),
      executor,
      sequencer: self.sequencer,
      state: InvocationState::new(),
      params: self.params,
    })
  }
}
