//! Implementation of the `cadence run` command.
//!
//! Configures the build, executes the requested tasks and prints a summary
//! once the invocation has finished.

use anyhow::{Context, Result};
use clap::Args;

use cadence_lib::BuildController;
use cadence_lib::execute::DryRunExecutor;
use cadence_lib::invocation::{FinishedBuild, HookError, hook_fn};

use super::{BuildArgs, cancel_on_interrupt};
use crate::output::{format_duration, print_error, print_stat, print_success, print_warning};

#[derive(Args, Debug)]
pub struct RunArgs {
  /// Tasks to run (`project:task` or `task`). Defaults to the build's default tasks.
  pub tasks: Vec<String>,

  #[command(flatten)]
  pub build: BuildArgs,

  /// Keep running independent tasks after a task failed
  #[arg(long = "continue")]
  pub continue_on_failure: bool,

  /// Maximum number of tasks to run at the same time
  #[arg(short = 'j', long)]
  pub jobs: Option<usize>,

  /// Shell used to run task commands
  #[arg(long)]
  pub shell: Option<String>,

  /// Select tasks without running their commands
  #[arg(long)]
  pub dry_run: bool,
}

pub fn cmd_run(args: RunArgs) -> Result<()> {
  let mut params = args.build.start_parameters()?.with_tasks(args.tasks);
  params.continue_on_failure = args.continue_on_failure;
  if let Some(jobs) = args.jobs {
    params.parallelism = jobs.max(1);
  }
  if args.shell.is_some() {
    params.shell = args.shell;
  }

  let _interrupts = cancel_on_interrupt(params.cancellation.clone())?;

  let mut builder = BuildController::builder(params).hook(hook_fn("summary", print_summary));
  if args.dry_run {
    builder = builder.executor(DryRunExecutor);
  }
  let mut controller = builder.build().context("Failed to create task executor")?;

  controller.run().context("Build failed")?;
  Ok(())
}

fn print_summary(build: &FinishedBuild<'_>) -> Result<(), HookError> {
  if let Some(execution) = build.execution {
    for failure in execution.failures() {
      print_error(&failure.to_string());
    }
    for (path, reason) in &execution.skipped {
      print_warning(&format!("{} not run: {}", path, reason));
    }
  }

  let elapsed = format_duration(build.elapsed);
  match build.outcome.failure() {
    None => print_success(&format!("BUILD SUCCESSFUL in {}", elapsed)),
    Some(_) => print_error(&format!("BUILD FAILED in {}", elapsed)),
  }

  if let Some(execution) = build.execution {
    print_stat("Succeeded", &execution.succeeded.len().to_string());
    print_stat("Failed", &execution.failed.len().to_string());
    print_stat("Not run", &execution.skipped.len().to_string());
  }
  Ok(())
}
