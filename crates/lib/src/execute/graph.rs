//! Task graph for dependency ordering.
//!
//! This module provides a directed acyclic graph of the tasks selected for an
//! invocation and computes the waves in which they can be executed.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::consts::TASK_PATH_SEPARATOR;
use crate::model::{BuildModel, TaskPath};

use super::types::GraphError;

/// Everything an executor needs to run one task, detached from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
  pub path: TaskPath,
  pub command: Option<String>,
  pub env: BTreeMap<String, String>,

  /// Working directory for the command.
  pub dir: PathBuf,

  pub depends_on: Vec<TaskPath>,
}

/// The tasks selected for execution and the edges between them.
///
/// Edges point from a dependency to its dependent. The graph is verified to
/// be acyclic on construction.
#[derive(Debug)]
pub struct TaskGraph {
  graph: DiGraph<TaskPath, ()>,
  nodes: HashMap<TaskPath, NodeIndex>,
  tasks: BTreeMap<TaskPath, ScheduledTask>,
}

impl TaskGraph {
  /// Build the graph for the model's requested tasks, or its default tasks
  /// when none were requested, including every transitive dependency.
  pub fn from_model(model: &BuildModel) -> Result<Self, GraphError> {
    let selectors = if model.requested_tasks.is_empty() {
      &model.default_tasks
    } else {
      &model.requested_tasks
    };
    if selectors.is_empty() {
      return Err(GraphError::NothingToRun);
    }

    let mut queue = VecDeque::new();
    for selector in selectors {
      queue.extend(resolve_selector(model, selector)?);
    }

    let mut tasks = BTreeMap::new();
    while let Some(path) = queue.pop_front() {
      if tasks.contains_key(&path) {
        continue;
      }
      let def = model
        .task(&path)
        .ok_or_else(|| GraphError::TaskNotFound(path.to_string()))?;
      queue.extend(def.depends_on.iter().cloned());

      let dir = model
        .project_dir(&path.project)
        .unwrap_or_else(|| model.root_dir.clone());
      tasks.insert(
        path.clone(),
        ScheduledTask {
          path,
          command: def.command.clone(),
          env: def.env.clone(),
          dir,
          depends_on: def.depends_on.clone(),
        },
      );
    }

    Self::from_tasks(tasks)
  }

  /// Build a graph directly from scheduled tasks.
  ///
  /// Dependencies that are not part of `tasks` are ignored.
  pub fn from_tasks(tasks: BTreeMap<TaskPath, ScheduledTask>) -> Result<Self, GraphError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for path in tasks.keys() {
      let idx = graph.add_node(path.clone());
      nodes.insert(path.clone(), idx);
    }

    for (path, task) in &tasks {
      let dependent_idx = nodes[path];
      for dep in &task.depends_on {
        if let Some(&dep_idx) = nodes.get(dep) {
          // Edge from dependency to dependent
          graph.add_edge(dep_idx, dependent_idx, ());
        }
      }
    }

    let task_graph = Self { graph, nodes, tasks };
    task_graph.verify_acyclic()?;

    debug!(
      tasks = task_graph.len(),
      edges = task_graph.graph.edge_count(),
      "task graph built"
    );
    Ok(task_graph)
  }

  fn verify_acyclic(&self) -> Result<(), GraphError> {
    toposort(&self.graph, None).map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].clone()))?;
    Ok(())
  }

  /// Tasks in an order where dependencies come before dependents.
  pub fn topological_order(&self) -> Vec<TaskPath> {
    self.waves().into_iter().flatten().collect()
  }

  /// Group tasks into waves.
  ///
  /// Each wave contains tasks whose dependencies are all in previous waves,
  /// so the tasks of one wave can run in parallel. Tasks within a wave are
  /// sorted by path.
  pub fn waves(&self) -> Vec<Vec<TaskPath>> {
    let mut in_degree: HashMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();
    let mut waves = Vec::new();

    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|&&idx| in_degree[&idx] == 0).copied().collect();

      // Unreachable for a verified graph.
      if ready.is_empty() {
        break;
      }

      for &idx in &ready {
        remaining.remove(&idx);
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      ready.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
      waves.push(ready.into_iter().map(|idx| self.graph[idx].clone()).collect());
    }

    waves
  }

  /// Direct dependencies of a task that are part of this graph.
  pub fn dependencies(&self, path: &TaskPath) -> Vec<TaskPath> {
    let Some(&idx) = self.nodes.get(path) else {
      return Vec::new();
    };

    let mut deps: Vec<TaskPath> = self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep_idx| self.graph[dep_idx].clone())
      .collect();
    deps.sort();
    deps
  }

  pub fn task(&self, path: &TaskPath) -> Option<&ScheduledTask> {
    self.tasks.get(path)
  }

  pub fn tasks(&self) -> impl Iterator<Item = &ScheduledTask> {
    self.tasks.values()
  }

  pub fn contains(&self, path: &TaskPath) -> bool {
    self.nodes.contains_key(path)
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }
}

/// Resolve a selector to task paths.
///
/// `project:task` names exactly one task; a bare `task` selects that task in
/// every project that declares it.
fn resolve_selector(model: &BuildModel, selector: &str) -> Result<Vec<TaskPath>, GraphError> {
  let not_found = || GraphError::TaskNotFound(selector.to_string());

  if selector.contains(TASK_PATH_SEPARATOR) {
    let path: TaskPath = selector.parse().map_err(|_| not_found())?;
    return model.task(&path).map(|_| vec![path]).ok_or_else(not_found);
  }

  let matches: Vec<TaskPath> = model
    .projects
    .iter()
    .filter(|(_, project)| project.tasks.contains_key(selector))
    .map(|(name, _)| TaskPath::new(name.clone(), selector))
    .collect();

  if matches.is_empty() { Err(not_found()) } else { Ok(matches) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{ProjectModel, TaskDef};

  fn task(deps: &[&str]) -> TaskDef {
    TaskDef {
      command: Some("true".to_string()),
      depends_on: deps.iter().map(|d| d.parse().unwrap()).collect(),
      ..Default::default()
    }
  }

  /// lib:compile <- lib:build <- app:build, lib:test standalone, app:lint standalone
  fn model(requested: &[&str]) -> BuildModel {
    let mut lib = ProjectModel {
      name: "lib".to_string(),
      dir: PathBuf::from("lib"),
      ..Default::default()
    };
    lib.tasks.insert("compile".to_string(), task(&[]));
    lib.tasks.insert("build".to_string(), task(&["lib:compile"]));
    lib.tasks.insert("test".to_string(), task(&[]));

    let mut app = ProjectModel {
      name: "app".to_string(),
      dir: PathBuf::from("app"),
      ..Default::default()
    };
    app.tasks.insert("build".to_string(), task(&["lib:build"]));
    app.tasks.insert("lint".to_string(), task(&[]));

    let mut model = BuildModel {
      root_dir: PathBuf::from("/work"),
      requested_tasks: requested.iter().map(|s| s.to_string()).collect(),
      ..Default::default()
    };
    model.projects.insert("lib".to_string(), lib);
    model.projects.insert("app".to_string(), app);
    model
  }

  fn paths(items: &[&str]) -> Vec<TaskPath> {
    items.iter().map(|s| s.parse().unwrap()).collect()
  }

  #[test]
  fn includes_transitive_dependencies() {
    let graph = TaskGraph::from_model(&model(&["app:build"])).unwrap();
    assert_eq!(graph.len(), 3);
    assert!(graph.contains(&TaskPath::new("lib", "compile")));
    assert!(!graph.contains(&TaskPath::new("lib", "test")));
    assert_eq!(
      graph.waves(),
      vec![paths(&["lib:compile"]), paths(&["lib:build"]), paths(&["app:build"])]
    );
  }

  #[test]
  fn bare_selector_matches_every_project() {
    let graph = TaskGraph::from_model(&model(&["build"])).unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.dependencies(&TaskPath::new("app", "build")), paths(&["lib:build"]));
  }

  #[test]
  fn independent_tasks_share_a_wave() {
    let graph = TaskGraph::from_model(&model(&["lib:test", "app:lint", "lib:compile"])).unwrap();
    assert_eq!(graph.waves(), vec![paths(&["app:lint", "lib:compile", "lib:test"])]);
  }

  #[test]
  fn scheduled_task_uses_project_dir() {
    let graph = TaskGraph::from_model(&model(&["app:lint"])).unwrap();
    let task = graph.task(&TaskPath::new("app", "lint")).unwrap();
    assert_eq!(task.dir, PathBuf::from("/work/app"));
    assert_eq!(task.command.as_deref(), Some("true"));
  }

  #[test]
  fn falls_back_to_default_tasks() {
    let mut model = model(&[]);
    model.default_tasks = vec!["lint".to_string()];
    let graph = TaskGraph::from_model(&model).unwrap();
    assert_eq!(graph.topological_order(), paths(&["app:lint"]));
  }

  #[test]
  fn nothing_to_run() {
    let err = TaskGraph::from_model(&model(&[])).unwrap_err();
    assert_eq!(err, GraphError::NothingToRun);
  }

  #[test]
  fn unknown_task() {
    for selector in ["deploy", "app:deploy", "nope:build"] {
      let err = TaskGraph::from_model(&model(&[selector])).unwrap_err();
      assert_eq!(err, GraphError::TaskNotFound(selector.to_string()));
    }
  }

  #[test]
  fn cycle_is_rejected() {
    let mut model = model(&["lib:compile"]);
    let lib = model.projects.get_mut("lib").unwrap();
    lib.tasks.insert("compile".to_string(), task(&["lib:build"]));

    let err = TaskGraph::from_model(&model).unwrap_err();
    assert!(matches!(err, GraphError::CycleDetected(_)));
  }
}
