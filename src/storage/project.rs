//! Project management
//!
//! Handles project initialization and moves the dependency graph in and out
//! of the JSONL stores.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, warn};

use super::config::PROJECT_DIR;
use super::{Config, EdgeStore, TaskStore};
use crate::domain::{DependencyEdge, DependencyGraph, TaskId};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Not in a depgate project. Run 'depgate init' first.")]
    NotInProject,

    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

/// Held for the duration of a read-modify-write cycle on the stores
///
/// Released when dropped.
pub struct ProjectLock {
    file: File,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// A depgate project
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        if !project_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        if project_dir.join("config.toml").exists() {
            return Err(ProjectError::AlreadyExists(root).into());
        }

        fs::create_dir_all(&project_dir)
            .map_err(|e| ProjectError::CreateFailed(format!("{}: {}", project_dir.display(), e)))?;

        let config_path = project_dir.join("config.toml");
        let default_config = r#"# depgate configuration

# Tasks must start and end inside this range once both ends are set
[project]
# start = "2025-01-01"
# end = "2025-12-31"

[policy]
# Let --force override mandatory dependency violations
allow_force = false
# Give up on auto-fix and rescheduling after this many iterations
max_fix_iterations = 32

# Extra status names, mapped onto todo, doing or done
[status.aliases]
"#;
        fs::write(&config_path, default_config)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "lock\n*.tmp\n").with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .depgate directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Returns the task store
    pub fn task_store(&self) -> TaskStore {
        TaskStore::for_project(&self.root)
    }

    /// Returns the edge store
    pub fn edge_store(&self) -> EdgeStore {
        EdgeStore::for_project(&self.root)
    }

    /// Takes the project-wide exclusive lock
    ///
    /// Commands that load, modify and save the graph hold this so that two
    /// processes cannot interleave their writes.
    pub fn lock(&self) -> Result<ProjectLock> {
        let file = self.open_lock_file()?;
        file.lock_exclusive()
            .context("Failed to acquire project lock")?;

        Ok(ProjectLock { file })
    }

    /// Takes the project lock in shared mode
    ///
    /// Read-only commands hold this while loading the graph so they never see
    /// a save half done.
    pub fn read_lock(&self) -> Result<ProjectLock> {
        let file = self.open_lock_file()?;
        file.lock_shared()
            .context("Failed to acquire project read lock")?;

        Ok(ProjectLock { file })
    }

    fn open_lock_file(&self) -> Result<File> {
        let path = self.project_dir().join("lock");
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))
    }

    /// Loads every task and edge into a validated graph
    ///
    /// Edges whose endpoints are missing from the task store are dropped with
    /// a warning, as removing the task would have done.
    pub fn load_graph(&self) -> Result<DependencyGraph> {
        let tasks = self.task_store().read_sorted()?;
        let mut edges = self.edge_store().read_sorted()?;

        let known: HashSet<&TaskId> = tasks.iter().map(|task| &task.id).collect();
        edges.retain(|edge| {
            let attached = known.contains(&edge.predecessor) && known.contains(&edge.successor);
            if !attached {
                warn!(edge = %edge.id, "dropping dependency on a missing task");
            }
            attached
        });
        debug!(tasks = tasks.len(), edges = edges.len(), "loading graph");

        DependencyGraph::from_parts(tasks, edges).context("Stored dependency graph is invalid")
    }

    /// Writes the whole graph back to the stores
    ///
    /// Both files are staged before either is replaced, and the renames run in
    /// the order that keeps the stores loadable if the second one never
    /// happens.
    pub fn save_graph(&self, graph: &DependencyGraph) -> Result<()> {
        let task_store = self.task_store();
        let stored: HashSet<TaskId> = task_store.read_all()?.into_keys().collect();

        let tasks = task_store.stage(graph.tasks())?;
        let edges = self.edge_store().stage(graph.edges())?;

        if edges_fit(&stored, graph.edges()) {
            edges.commit()?;
            tasks.commit()?;
        } else {
            tasks.commit()?;
            edges.commit()?;
        }

        debug!(tasks = graph.len(), edges = graph.edge_count(), "saved graph");
        Ok(())
    }
}

/// Returns true if every edge only touches tasks already on disk
fn edges_fit<'a>(
    stored: &HashSet<TaskId>,
    mut edges: impl Iterator<Item = &'a DependencyEdge>,
) -> bool {
    edges.all(|edge| stored.contains(&edge.predecessor) && stored.contains(&edge.successor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyEdge, Lag, RelationType, Task, TaskStatus};
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.project_dir().is_dir());
        assert!(project.project_dir().join("config.toml").is_file());
        assert!(project.project_dir().join(".gitignore").is_file());
        assert!(!project.config().project.policy.allow_force);
    }

    #[test]
    fn init_twice_fails() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        let err = Project::init(dir.path()).unwrap_err();

        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn stores_are_accessible() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.task_store().path().ends_with("tasks.jsonl"));
        assert!(project.edge_store().path().ends_with("edges.jsonl"));
    }

    #[test]
    fn graph_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let mut graph = DependencyGraph::new();
        let a = Task::new("t-a".parse().unwrap(), "A").with_status(TaskStatus::Done);
        let b = Task::new("t-b".parse().unwrap(), "B");
        graph.add_task(a.clone()).unwrap();
        graph.add_task(b.clone()).unwrap();
        graph
            .add_edge(DependencyEdge::new(
                a.id.clone(),
                b.id.clone(),
                RelationType::FinishToFinish,
                Lag::new(3).unwrap(),
            ))
            .unwrap();

        {
            let _lock = project.lock().unwrap();
            project.save_graph(&graph).unwrap();
        }

        let loaded = project.load_graph().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.edge_count(), 1);
        assert_eq!(loaded.task(&a.id).unwrap().status, TaskStatus::Done);
        assert_eq!(loaded.successors_of(&a.id).unwrap()[0].lag.days(), 3);
    }

    fn linked_pair(project: &Project) -> (DependencyGraph, Task, Task) {
        let mut graph = DependencyGraph::new();
        let a = Task::new("t-a".parse().unwrap(), "A");
        let b = Task::new("t-b".parse().unwrap(), "B");
        graph.add_task(a.clone()).unwrap();
        graph.add_task(b.clone()).unwrap();
        graph
            .add_edge(DependencyEdge::new(
                a.id.clone(),
                b.id.clone(),
                RelationType::FinishToStart,
                Lag::new(0).unwrap(),
            ))
            .unwrap();
        project.save_graph(&graph).unwrap();
        (graph, a, b)
    }

    #[test]
    fn half_written_removal_still_loads() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let (mut graph, a, b) = linked_pair(&project);

        // Task file replaced, edge file still holds the edge to t-b
        graph.remove_task(&b.id).unwrap();
        project.task_store().write_all(graph.tasks()).unwrap();
        assert_eq!(project.edge_store().read_all().unwrap().len(), 1);

        let loaded = project.load_graph().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.edge_count(), 0);
        assert!(loaded.contains(&a.id));
    }

    #[test]
    fn removal_replaces_edges_before_tasks() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();
        let (mut graph, a, b) = linked_pair(&project);
        let stored: HashSet<TaskId> = project.task_store().read_all().unwrap().into_keys().collect();

        graph.remove_task(&b.id).unwrap();
        assert!(edges_fit(&stored, graph.edges()));

        // An edge to a task not yet on disk needs the task file first
        let c = Task::new("t-c".parse().unwrap(), "C");
        graph.add_task(c.clone()).unwrap();
        graph.link(&a.id, &c.id, "FS", 0, true).unwrap();
        assert!(!edges_fit(&stored, graph.edges()));

        project.save_graph(&graph).unwrap();
        let loaded = project.load_graph().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.edge_count(), 1);
        assert!(!project.project_dir().join("tasks.jsonl.tmp").exists());
        assert!(!project.project_dir().join("edges.jsonl.tmp").exists());
    }

    #[test]
    fn read_locks_are_shared() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let first = project.read_lock().unwrap();
        let second = project.read_lock().unwrap();
        drop(first);
        drop(second);
        // Would block forever if a read lock were still held
        drop(project.lock().unwrap());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        drop(project.lock().unwrap());
        // Would block forever if the first lock were still held
        drop(project.lock().unwrap());
    }
}
