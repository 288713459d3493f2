mod configure;
mod run;
mod tasks;

pub use configure::cmd_configure;
pub use run::{RunArgs, cmd_run};
pub use tasks::cmd_tasks;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;
use tracing::warn;

use cadence_lib::consts::APP_NAME;
use cadence_lib::params::parse_property;
use cadence_lib::{CancellationToken, StartParameters};

/// Options shared by every command that configures a build.
#[derive(Args, Debug)]
pub struct BuildArgs {
  /// Root directory of the build
  #[arg(short = 'p', long, default_value = ".")]
  pub project_dir: PathBuf,

  /// Build file, relative to the project directory (default: cadence.json)
  #[arg(short = 'b', long)]
  pub build_file: Option<PathBuf>,

  /// Set a build property, overriding the build file (key=value)
  #[arg(short = 'P', long = "property", value_parser = parse_property)]
  pub properties: Vec<(String, String)>,
}

impl BuildArgs {
  /// Start parameters from the environment, then the command line.
  pub fn start_parameters(&self) -> Result<StartParameters> {
    let project_dir = std::path::absolute(&self.project_dir)
      .with_context(|| format!("Invalid project directory: {}", self.project_dir.display()))?;

    let mut params = StartParameters::new(project_dir).with_env_overrides();
    if let Some(build_file) = &self.build_file {
      params.build_file = Some(build_file.clone());
    }
    params.properties.extend(self.properties.iter().cloned());
    Ok(params)
  }
}

/// Cancel `token` when the user presses Ctrl-C.
///
/// The listener lives on the returned runtime; keep it alive for the duration
/// of the build.
pub fn cancel_on_interrupt(token: CancellationToken) -> Result<Runtime> {
  let runtime = tokio::runtime::Builder::new_multi_thread()
    .worker_threads(1)
    .thread_name(format!("{}-signal", APP_NAME))
    .enable_all()
    .build()
    .context("Failed to create signal runtime")?;

  runtime.spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling build");
      token.cancel();
    }
  });

  Ok(runtime)
}
