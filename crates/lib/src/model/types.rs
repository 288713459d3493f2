//! Core model types: projects, tasks and task paths.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TASK_PATH_SEPARATOR;

/// Error returned when a string is not a valid `project:task` path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task path '{0}': expected project:task")]
pub struct TaskPathError(pub String);

/// Fully qualified name of a task, displayed as `project:task`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskPath {
  pub project: String,
  pub task: String,
}

impl TaskPath {
  pub fn new(project: impl Into<String>, task: impl Into<String>) -> Self {
    Self {
      project: project.into(),
      task: task.into(),
    }
  }
}

impl fmt::Display for TaskPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.project, TASK_PATH_SEPARATOR, self.task)
  }
}

impl FromStr for TaskPath {
  type Err = TaskPathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.split_once(TASK_PATH_SEPARATOR) {
      Some((project, task))
        if !project.is_empty() && !task.is_empty() && !task.contains(TASK_PATH_SEPARATOR) =>
      {
        Ok(TaskPath::new(project, task))
      }
      _ => Err(TaskPathError(s.to_string())),
    }
  }
}

impl TryFrom<String> for TaskPath {
  type Error = TaskPathError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<TaskPath> for String {
  fn from(path: TaskPath) -> Self {
    path.to_string()
  }
}

/// A task declared by a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
  pub description: Option<String>,

  /// Shell command to run. Tasks without a command only aggregate their dependencies.
  pub command: Option<String>,

  /// Tasks that must complete successfully before this one runs.
  pub depends_on: Vec<TaskPath>,

  /// Extra environment variables for the command.
  pub env: BTreeMap<String, String>,
}

/// A project and the tasks it declares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectModel {
  pub name: String,

  /// Project directory, relative to the build root.
  pub dir: PathBuf,

  pub tasks: BTreeMap<String, TaskDef>,
}

/// Configured state of one build.
///
/// Uses [`BTreeMap`]s so iteration and serialization order are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildModel {
  /// Root directory of the build.
  pub root_dir: PathBuf,

  pub projects: BTreeMap<String, ProjectModel>,

  /// Task selectors requested by the invocation.
  pub requested_tasks: Vec<String>,

  /// Task selectors used when the invocation requests no tasks.
  pub default_tasks: Vec<String>,

  /// Free-form values contributed by the build file.
  pub extensions: BTreeMap<String, serde_json::Value>,

  /// Effective properties: build file values overridden by start parameters.
  pub parameters: BTreeMap<String, String>,
}

impl BuildModel {
  pub fn task(&self, path: &TaskPath) -> Option<&TaskDef> {
    self.projects.get(&path.project)?.tasks.get(&path.task)
  }

  /// All tasks of all projects, ordered by path.
  pub fn tasks(&self) -> impl Iterator<Item = (TaskPath, &TaskDef)> {
    self.projects.iter().flat_map(|(project, model)| {
      model
        .tasks
        .iter()
        .map(move |(name, def)| (TaskPath::new(project.clone(), name.clone()), def))
    })
  }

  pub fn task_count(&self) -> usize {
    self.projects.values().map(|p| p.tasks.len()).sum()
  }

  /// Absolute directory of a project.
  pub fn project_dir(&self, project: &str) -> Option<PathBuf> {
    self.projects.get(project).map(|p| self.root_dir.join(&p.dir))
  }
}
