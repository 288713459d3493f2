use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use cmd::{BuildArgs, RunArgs, cmd_configure, cmd_run, cmd_tasks};
use output::OutputFormat;

/// cadence - Configure and run project builds
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Configure the build and execute the requested tasks
  Run(RunArgs),

  /// Configure the build and print the resulting model
  Configure {
    #[command(flatten)]
    build: BuildArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List the tasks declared by the build
  Tasks {
    #[command(flatten)]
    build: BuildArgs,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Run(args) => cmd_run(args),
    Commands::Configure { build, output } => cmd_configure(build, output),
    Commands::Tasks { build } => cmd_tasks(build),
  }
}
