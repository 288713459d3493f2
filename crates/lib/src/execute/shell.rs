//! Shell task executor.
//!
//! Runs the commands of a [`TaskGraph`] wave by wave. Tasks inside a wave run
//! in parallel, bounded by [`ExecuteConfig::parallelism`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::consts::APP_NAME;
use crate::model::TaskPath;

use super::TaskGraphExecutor;
use super::graph::{ScheduledTask, TaskGraph};
use super::types::{ExecuteConfig, ExecutionResult, SkipReason, TaskError, TaskFailure};

/// Executes task commands through the platform shell.
///
/// Owns the runtime its workers run on, so [`TaskGraphExecutor::execute`] can
/// be called from synchronous code. Must not be called from inside another
/// tokio runtime; use [`execute_graph`] there.
pub struct ShellExecutor {
  config: ExecuteConfig,
  runtime: Runtime,
}

impl ShellExecutor {
  pub fn new(config: ExecuteConfig) -> std::io::Result<Self> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
      .worker_threads(config.parallelism.max(1))
      .thread_name(format!("{}-task", APP_NAME))
      .enable_all()
      .build()?;
    Ok(Self { config, runtime })
  }

  pub fn config(&self) -> &ExecuteConfig {
    &self.config
  }
}

impl TaskGraphExecutor for ShellExecutor {
  fn execute(&self, graph: &TaskGraph) -> ExecutionResult {
    self.runtime.block_on(execute_graph(graph, &self.config))
  }
}

/// Execute every task of a graph.
///
/// It:
/// 1. Computes the graph's execution waves
/// 2. Skips tasks whose dependencies failed or were skipped
/// 3. Runs the remaining tasks of a wave in parallel
/// 4. Stops after the first failing wave unless `continue_on_failure` is set
/// 5. Starts no further wave once the build is cancelled
pub async fn execute_graph(graph: &TaskGraph, config: &ExecuteConfig) -> ExecutionResult {
  let started = Instant::now();
  let waves = graph.waves();
  info!(tasks = graph.len(), wave_count = waves.len(), "starting task execution");

  let mut result = ExecutionResult::default();
  let mut unavailable: HashSet<TaskPath> = HashSet::new();
  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
  let mut stopped = false;

  for (wave_idx, wave) in waves.iter().enumerate() {
    if stopped {
      for path in wave {
        result.skipped.insert(path.clone(), SkipReason::Stopped);
      }
      continue;
    }

    if config.cancellation.is_cancelled() {
      warn!(wave = wave_idx, "build cancelled, not starting remaining tasks");
      for path in waves[wave_idx..].iter().flatten() {
        result.skipped.insert(path.clone(), SkipReason::Cancelled);
      }
      break;
    }

    debug!(wave = wave_idx, tasks = wave.len(), "executing wave");

    let mut ready = Vec::new();
    for path in wave {
      let failed_dep = graph.dependencies(path).into_iter().find(|dep| unavailable.contains(dep));
      if let Some(dep) = failed_dep {
        warn!(task = %path, failed_dep = %dep, "skipping task due to failed dependency");
        unavailable.insert(path.clone());
        result.skipped.insert(path.clone(), SkipReason::FailedDependency(dep));
      } else if let Some(task) = graph.task(path) {
        ready.push(task.clone());
      }
    }

    for (path, outcome) in execute_wave(ready, config, semaphore.clone()).await {
      match outcome {
        Ok(()) => {
          info!(task = %path, "task succeeded");
          result.succeeded.push(path);
        }
        Err(cause) => {
          error!(task = %path, error = %cause, "task failed");
          unavailable.insert(path.clone());
          result.failed.push(TaskFailure { task: path, cause });
        }
      }
    }

    if !result.failed.is_empty() && !config.continue_on_failure {
      stopped = true;
    }
  }

  result.duration = started.elapsed();
  info!(
    succeeded = result.succeeded.len(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "task execution complete"
  );
  result
}

/// Run one wave of tasks in parallel. Results are sorted by task path.
async fn execute_wave(
  tasks: Vec<ScheduledTask>,
  config: &ExecuteConfig,
  semaphore: Arc<Semaphore>,
) -> Vec<(TaskPath, Result<(), TaskError>)> {
  let expected: Vec<TaskPath> = tasks.iter().map(|t| t.path.clone()).collect();
  let mut join_set = JoinSet::new();

  for task in tasks {
    let shell = config.shell.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      // Held until the task finishes
      let _permit = semaphore.acquire_owned().await;
      let outcome = run_task(&task, shell.as_deref()).await;
      (task.path, outcome)
    });
  }

  let mut results = Vec::new();
  let mut panics = Vec::new();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(done) => results.push(done),
      Err(e) => {
        error!(error = %e, "task worker panicked");
        panics.push(e.to_string());
      }
    }
  }

  // A task with no result lost its worker to a panic.
  for path in expected {
    if !results.iter().any(|(done, _)| *done == path) {
      let message = panics.pop().unwrap_or_else(|| "task worker terminated".to_string());
      results.push((path, Err(TaskError::Panicked(message))));
    }
  }

  results.sort_by(|a, b| a.0.cmp(&b.0));
  results
}

/// Run a single task's command in its project directory.
///
/// Tasks without a command succeed immediately. The command inherits the
/// process's stdout and stderr.
async fn run_task(task: &ScheduledTask, shell: Option<&str>) -> Result<(), TaskError> {
  let Some(cmd) = task.command.as_deref() else {
    debug!(task = %task.path, "no command, nothing to execute");
    return Ok(());
  };

  info!(task = %task.path, cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);
  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(&task.dir)
    .envs(&task.env)
    .kill_on_drop(true);

  debug!(shell = %shell_cmd, working_dir = ?task.dir, "spawning process");

  let status = command.status().await.map_err(|e| TaskError::Spawn {
    cmd: cmd.to_string(),
    message: e.to_string(),
  })?;

  if !status.success() {
    return Err(TaskError::CmdFailed {
      cmd: cmd.to_string(),
      code: status.code(),
    });
  }

  Ok(())
}

/// Get the shell command and arguments for the current platform.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
