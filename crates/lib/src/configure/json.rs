//! JSON build file loading.
//!
//! A build file looks like:
//!
//! ```json
//! {
//!   "defaultTasks": ["build"],
//!   "properties": { "profile": "debug" },
//!   "extensions": { "java": { "release": 21 } },
//!   "projects": {
//!     "lib": { "tasks": { "build": { "command": "make" } } },
//!     "app": {
//!       "dir": "apps/app",
//!       "tasks": { "build": { "command": "make", "dependsOn": ["lib:build"] } }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::consts::TASK_PATH_SEPARATOR;
use crate::model::{BuildModel, ProjectModel, TaskDef, TaskPath};
use crate::params::StartParameters;

use super::{ConfigurationBuilder, ConfigurationError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BuildFile {
  #[serde(default)]
  projects: BTreeMap<String, ProjectSpec>,
  #[serde(default)]
  default_tasks: Vec<String>,
  #[serde(default)]
  properties: BTreeMap<String, String>,
  #[serde(default)]
  extensions: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ProjectSpec {
  dir: Option<PathBuf>,
  #[serde(default)]
  tasks: BTreeMap<String, TaskSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TaskSpec {
  description: Option<String>,
  command: Option<String>,
  #[serde(default)]
  depends_on: Vec<String>,
  #[serde(default)]
  env: BTreeMap<String, String>,
}

/// Reads the build file named by [`StartParameters::build_file_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConfigurationBuilder;

impl JsonConfigurationBuilder {
  pub fn new() -> Self {
    Self
  }
}

impl ConfigurationBuilder for JsonConfigurationBuilder {
  fn populate(&self, params: &StartParameters) -> Result<BuildModel, ConfigurationError> {
    let path = params.build_file_path();
    info!(build_file = %path.display(), "loading build file");

    if !path.exists() {
      return Err(ConfigurationError::BuildFileNotFound(path));
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigurationError::Io {
      path: path.clone(),
      source,
    })?;
    let file: BuildFile =
      serde_json::from_str(&content).map_err(|source| ConfigurationError::Parse { path, source })?;

    let model = build_model(file, params)?;
    info!(
      projects = model.projects.len(),
      tasks = model.task_count(),
      "build file loaded"
    );
    Ok(model)
  }
}

fn build_model(file: BuildFile, params: &StartParameters) -> Result<BuildModel, ConfigurationError> {
  let mut projects = BTreeMap::new();

  for (name, spec) in &file.projects {
    validate_name("project", name)?;
    let mut tasks = BTreeMap::new();

    for (task_name, task) in &spec.tasks {
      validate_name("task", task_name)?;
      let path = TaskPath::new(name.clone(), task_name.clone());
      let depends_on = task
        .depends_on
        .iter()
        .map(|dep| resolve_dependency(&file, &path, dep))
        .collect::<Result<Vec<_>, _>>()?;

      debug!(task = %path, dependencies = depends_on.len(), "configured task");
      tasks.insert(
        task_name.clone(),
        TaskDef {
          description: task.description.clone(),
          command: task.command.clone(),
          depends_on,
          env: task.env.clone(),
        },
      );
    }

    projects.insert(
      name.clone(),
      ProjectModel {
        name: name.clone(),
        dir: spec.dir.clone().unwrap_or_else(|| PathBuf::from(name)),
        tasks,
      },
    );
  }

  let mut parameters = file.properties;
  parameters.extend(params.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

  Ok(BuildModel {
    root_dir: params.project_dir.clone(),
    projects,
    requested_tasks: params.requested_tasks.clone(),
    default_tasks: file.default_tasks,
    extensions: file.extensions,
    parameters,
  })
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), ConfigurationError> {
  if name.trim().is_empty() || name.contains(TASK_PATH_SEPARATOR) {
    return Err(ConfigurationError::InvalidName {
      kind,
      name: name.to_string(),
    });
  }
  Ok(())
}

/// Resolve a `dependsOn` entry. Bare names refer to the declaring project.
fn resolve_dependency(file: &BuildFile, task: &TaskPath, dep: &str) -> Result<TaskPath, ConfigurationError> {
  let unknown = || ConfigurationError::UnknownDependency {
    task: task.clone(),
    dependency: dep.to_string(),
  };

  let path = if dep.contains(TASK_PATH_SEPARATOR) {
    dep.parse::<TaskPath>().map_err(|_| unknown())?
  } else {
    TaskPath::new(task.project.clone(), dep)
  };

  let declared = file
    .projects
    .get(&path.project)
    .is_some_and(|p| p.tasks.contains_key(&path.task));
  if !declared {
    return Err(unknown());
  }
  Ok(path)
}
