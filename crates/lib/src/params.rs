//! Start parameters bound to a single build invocation.
//!
//! The transport (CLI, tests) assembles a [`StartParameters`] value and hands
//! it to the controller at construction. Nothing in here changes once the
//! invocation has started.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::warn;

use crate::consts::{DEFAULT_BUILD_FILE, ENV_BUILD_FILE, ENV_PARALLELISM, ENV_SHELL};

/// What the caller asked the invocation to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildAction {
  /// Configure the build, never touching the task graph.
  Configure,
  /// Configure, then build and execute the task graph.
  Run,
}

impl BuildAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      BuildAction::Configure => "configure",
      BuildAction::Run => "run",
    }
  }
}

impl fmt::Display for BuildAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Shared flag the transport sets to request that a build stop.
///
/// The controller only looks at it between phases; a phase that has started
/// always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Parameters a build invocation is started with.
#[derive(Debug, Clone)]
pub struct StartParameters {
  /// Root directory of the build. Relative project directories resolve against it.
  pub project_dir: PathBuf,

  /// Explicit build file. Relative paths resolve against `project_dir`.
  pub build_file: Option<PathBuf>,

  /// Task selectors (`project:task` or bare `task`). Empty means the build's default tasks.
  pub requested_tasks: Vec<String>,

  /// Properties given on the command line; they override the build file's `properties`.
  pub properties: BTreeMap<String, String>,

  /// Keep executing independent tasks after a task failed.
  pub continue_on_failure: bool,

  /// Maximum number of tasks executed at the same time.
  pub parallelism: usize,

  /// Shell used for task commands. `None` uses the platform default.
  pub shell: Option<String>,

  pub cancellation: CancellationToken,
}

impl StartParameters {
  pub fn new(project_dir: impl Into<PathBuf>) -> Self {
    Self {
      project_dir: project_dir.into(),
      build_file: None,
      requested_tasks: Vec::new(),
      properties: BTreeMap::new(),
      continue_on_failure: false,
      parallelism: num_cpus(),
      shell: None,
      cancellation: CancellationToken::new(),
    }
  }

  pub fn with_tasks<I, S>(mut self, tasks: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.requested_tasks = tasks.into_iter().map(Into::into).collect();
    self
  }

  /// Apply `CADENCE_*` environment variables.
  ///
  /// The build file and shell are only taken from the environment when unset.
  /// `CADENCE_PARALLELISM` replaces the current parallelism, so call this
  /// before applying command line flags. An unparsable value is ignored with
  /// a warning.
  pub fn with_env_overrides(mut self) -> Self {
    if self.build_file.is_none()
      && let Ok(file) = std::env::var(ENV_BUILD_FILE)
      && !file.is_empty()
    {
      self.build_file = Some(PathBuf::from(file));
    }

    if let Ok(value) = std::env::var(ENV_PARALLELISM) {
      match value.parse::<usize>() {
        Ok(n) if n > 0 => self.parallelism = n,
        _ => warn!(value = %value, "ignoring invalid {}", ENV_PARALLELISM),
      }
    }

    if self.shell.is_none()
      && let Ok(shell) = std::env::var(ENV_SHELL)
      && !shell.is_empty()
    {
      self.shell = Some(shell);
    }

    self
  }

  /// Absolute (or project-relative) location of the build file.
  pub fn build_file_path(&self) -> PathBuf {
    match &self.build_file {
      Some(path) if path.is_absolute() => path.clone(),
      Some(path) => self.project_dir.join(path),
      None => self.project_dir.join(DEFAULT_BUILD_FILE),
    }
  }
}

/// Parse a `key=value` property.
///
/// Usable directly as a clap `value_parser`.
pub fn parse_property(raw: &str) -> Result<(String, String), String> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("invalid property '{}': expected key=value", raw))?;
  let key = key.trim();
  if key.is_empty() {
    return Err(format!("invalid property '{}': empty key", raw));
  }
  Ok((key.to_string(), value.to_string()))
}

fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
