//! Implementation of the `cadence configure` command.
//!
//! Configures the build without running any task and prints the resulting
//! model from a completion hook, while the model is still readable.

use anyhow::{Context, Result};

use cadence_lib::BuildController;
use cadence_lib::execute::DryRunExecutor;
use cadence_lib::invocation::{FinishedBuild, HookError, hook_fn};
use cadence_lib::model::BuildModel;

use super::{BuildArgs, cancel_on_interrupt};
use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success, symbols};

pub fn cmd_configure(args: BuildArgs, output: OutputFormat) -> Result<()> {
  let params = args.start_parameters()?;
  let _interrupts = cancel_on_interrupt(params.cancellation.clone())?;

  let mut controller = BuildController::builder(params)
    .executor(DryRunExecutor)
    .hook(hook_fn("print-model", move |build| print_model(build, output)))
    .build()
    .context("Failed to create build controller")?;

  controller.configure().context("Configuration failed")?;
  Ok(())
}

fn print_model(build: &FinishedBuild<'_>, output: OutputFormat) -> Result<(), HookError> {
  let Some(model) = build.model else {
    return Ok(());
  };

  if output.is_json() {
    return print_json(model).map_err(HookError::msg);
  }

  print_success(&format!(
    "Configured {} in {}",
    model.root_dir.display(),
    format_duration(build.elapsed)
  ));
  print_stat("Projects", &model.projects.len().to_string());
  print_stat("Tasks", &model.task_count().to_string());
  if !model.default_tasks.is_empty() {
    print_stat("Default tasks", &model.default_tasks.join(", "));
  }

  print_projects(model);

  if !model.parameters.is_empty() {
    println!();
    println!("Properties:");
    for (key, value) in &model.parameters {
      println!("  {} {} = {}", symbols::INFO, key, value);
    }
  }

  if !model.extensions.is_empty() {
    println!();
    println!("Extensions:");
    for name in model.extensions.keys() {
      println!("  {} {}", symbols::INFO, name);
    }
  }
  Ok(())
}

fn print_projects(model: &BuildModel) {
  for (name, project) in &model.projects {
    println!();
    print_info(&format!("{} ({})", name, project.dir.display()));
    for task in project.tasks.keys() {
      println!("  {} {}", symbols::ARROW, task);
    }
  }
}
