//! Task graph construction and execution.
//!
//! The invocation controller depends on two collaborators from this module:
//! - [`TaskGraphBuilder`]: turns a configured model into a [`TaskGraph`]
//! - [`TaskGraphExecutor`]: runs a graph and reports one aggregated result
//!
//! Default implementations are [`DefaultGraphBuilder`], [`ShellExecutor`] and
//! [`DryRunExecutor`].

pub mod graph;
pub mod shell;
pub mod types;

use tracing::info;

use crate::model::BuildModel;

pub use graph::{ScheduledTask, TaskGraph};
pub use shell::{ShellExecutor, execute_graph};
pub use types::{ExecuteConfig, ExecutionResult, GraphError, SkipReason, TaskError, TaskFailure};

/// Builds the task graph for a configured model.
pub trait TaskGraphBuilder {
  fn build(&self, model: &BuildModel) -> Result<TaskGraph, GraphError>;
}

/// Executes a task graph.
///
/// Implementations may run tasks in parallel internally but must block until
/// every task has finished, failed or been skipped.
pub trait TaskGraphExecutor {
  fn execute(&self, graph: &TaskGraph) -> ExecutionResult;
}

/// Selects the model's requested (or default) tasks plus their dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGraphBuilder;

impl TaskGraphBuilder for DefaultGraphBuilder {
  fn build(&self, model: &BuildModel) -> Result<TaskGraph, GraphError> {
    TaskGraph::from_model(model)
  }
}

/// Reports every task as succeeded without running anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl TaskGraphExecutor for DryRunExecutor {
  fn execute(&self, graph: &TaskGraph) -> ExecutionResult {
    let order = graph.topological_order();
    for path in &order {
      info!(task = %path, "skipping execution (dry run)");
    }
    ExecutionResult {
      succeeded: order,
      ..Default::default()
    }
  }
}
