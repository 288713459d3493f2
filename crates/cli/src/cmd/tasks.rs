//! Implementation of the `cadence tasks` command.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use cadence_lib::BuildController;
use cadence_lib::execute::DryRunExecutor;
use cadence_lib::invocation::{FinishedBuild, HookError, hook_fn};

use super::{BuildArgs, cancel_on_interrupt};
use crate::output::{print_info, symbols};

pub fn cmd_tasks(args: BuildArgs) -> Result<()> {
  let params = args.start_parameters()?;
  let _interrupts = cancel_on_interrupt(params.cancellation.clone())?;

  let mut controller = BuildController::builder(params)
    .executor(DryRunExecutor)
    .hook(hook_fn("list-tasks", list_tasks))
    .build()
    .context("Failed to create build controller")?;

  controller.configure().context("Configuration failed")?;
  Ok(())
}

fn list_tasks(build: &FinishedBuild<'_>) -> Result<(), HookError> {
  let Some(model) = build.model else {
    return Ok(());
  };

  if model.task_count() == 0 {
    print_info("No tasks declared.");
    return Ok(());
  }

  for (path, task) in model.tasks() {
    let description = task.description.as_deref().unwrap_or("");
    println!(
      "{} {}",
      path.if_supports_color(Stream::Stdout, |s| s.bold()),
      description.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for dep in &task.depends_on {
      println!("  {} {}", symbols::ARROW, dep);
    }
  }
  Ok(())
}
