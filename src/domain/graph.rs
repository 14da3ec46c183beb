//! Dependency graph for tasks
//!
//! Holds tasks and typed edges with cycle detection and topological ordering.
//! Uses petgraph for graph operations; a stable graph keeps node and edge
//! indices valid across removals.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::HashMap;
use tracing::debug;

use super::edge::DependencyEdge;
use super::error::ScheduleError;
use super::id::{EdgeId, TaskId};
use super::task::{Task, TaskStatus};
use super::temporal::DateRange;

/// An edge together with the task on its other side
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeContext {
    pub edge: DependencyEdge,
    pub counterpart: Task,
}

/// Everything needed to validate one task, detached from the graph
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSnapshot {
    pub task: Task,
    /// Edges where the task is the successor
    pub predecessors: Vec<EdgeContext>,
    /// Edges where the task is the predecessor
    pub successors: Vec<EdgeContext>,
}

impl TaskSnapshot {
    /// Creates a snapshot with no edges
    pub fn isolated(task: Task) -> Self {
        Self {
            task,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }
}

/// A dependency graph for tasks
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Nodes carry task IDs, edges carry edge IDs
    graph: StableDiGraph<TaskId, EdgeId>,

    tasks: HashMap<TaskId, (NodeIndex, Task)>,

    edges: HashMap<EdgeId, (EdgeIndex, DependencyEdge)>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from stored tasks and edges
    pub fn from_parts(
        tasks: impl IntoIterator<Item = Task>,
        edges: impl IntoIterator<Item = DependencyEdge>,
    ) -> Result<Self, ScheduleError> {
        let mut graph = Self::new();

        for task in tasks {
            graph.add_task(task)?;
        }

        for edge in edges {
            graph.add_edge(edge)?;
        }

        Ok(graph)
    }

    /// Adds a task, replacing any existing task with the same ID
    pub fn add_task(&mut self, task: Task) -> Result<(), ScheduleError> {
        task.validate()?;

        if let Some((_, existing)) = self.tasks.get_mut(&task.id) {
            *existing = task;
            return Ok(());
        }

        let idx = self.graph.add_node(task.id.clone());
        self.tasks.insert(task.id.clone(), (idx, task));
        Ok(())
    }

    /// Removes a task and every edge touching it
    pub fn remove_task(&mut self, task_id: &TaskId) -> Result<Task, ScheduleError> {
        let (idx, task) = self
            .tasks
            .remove(task_id)
            .ok_or_else(|| ScheduleError::TaskNotFound(task_id.clone()))?;

        self.edges
            .retain(|_, (_, edge)| &edge.predecessor != task_id && &edge.successor != task_id);
        self.graph.remove_node(idx);

        debug!(task = %task_id, "removed task");
        Ok(task)
    }

    pub fn task(&self, task_id: &TaskId) -> Result<&Task, ScheduleError> {
        self.tasks
            .get(task_id)
            .map(|(_, task)| task)
            .ok_or_else(|| ScheduleError::TaskNotFound(task_id.clone()))
    }

    fn task_mut(&mut self, task_id: &TaskId) -> Result<&mut Task, ScheduleError> {
        self.tasks
            .get_mut(task_id)
            .map(|(_, task)| task)
            .ok_or_else(|| ScheduleError::TaskNotFound(task_id.clone()))
    }

    fn node(&self, task_id: &TaskId) -> Result<NodeIndex, ScheduleError> {
        self.tasks
            .get(task_id)
            .map(|(idx, _)| *idx)
            .ok_or_else(|| ScheduleError::TaskNotFound(task_id.clone()))
    }

    /// Replaces a task's start and deadline
    pub fn set_dates(&mut self, task_id: &TaskId, dates: DateRange) -> Result<(), ScheduleError> {
        self.task_mut(task_id)?.set_dates(dates);
        Ok(())
    }

    pub fn set_status(&mut self, task_id: &TaskId, status: TaskStatus) -> Result<(), ScheduleError> {
        self.task_mut(task_id)?.set_status(status);
        Ok(())
    }

    /// Adds a dependency edge
    ///
    /// The edge direction is: predecessor -> successor.
    /// Fails if either task is unknown, if the pair is already linked, or if
    /// the edge would close a cycle.
    pub fn add_edge(&mut self, edge: DependencyEdge) -> Result<(), ScheduleError> {
        if edge.predecessor == edge.successor {
            return Err(ScheduleError::SelfDependency(edge.predecessor.clone()));
        }

        let pred_idx = self.node(&edge.predecessor)?;
        let succ_idx = self.node(&edge.successor)?;

        if self.edges.contains_key(&edge.id) {
            return Err(ScheduleError::DuplicateEdge(edge.id.to_string()));
        }

        if self.graph.find_edge(pred_idx, succ_idx).is_some() {
            return Err(ScheduleError::DuplicateEdge(format!(
                "{} -> {}",
                edge.predecessor, edge.successor
            )));
        }

        // A path successor ~> predecessor means the new edge closes a loop
        if has_path_connecting(&self.graph, succ_idx, pred_idx, None) {
            return Err(ScheduleError::CycleDetected {
                predecessor: edge.predecessor.clone(),
                successor: edge.successor.clone(),
            });
        }

        let edge_idx = self.graph.add_edge(pred_idx, succ_idx, edge.id.clone());
        debug!(
            edge = %edge.id,
            predecessor = %edge.predecessor,
            successor = %edge.successor,
            relation = %edge.relation,
            lag = edge.lag.days(),
            mandatory = edge.mandatory,
            "added dependency"
        );
        self.edges.insert(edge.id.clone(), (edge_idx, edge));
        Ok(())
    }

    /// Parses and adds an edge from raw input, returning its generated ID
    pub fn link(
        &mut self,
        predecessor: &TaskId,
        successor: &TaskId,
        relation: &str,
        lag: i64,
        mandatory: bool,
    ) -> Result<EdgeId, ScheduleError> {
        let edge = DependencyEdge::parse(
            predecessor.clone(),
            successor.clone(),
            relation,
            lag,
            mandatory,
            chrono::Utc::now(),
        )?;
        let id = edge.id.clone();
        self.add_edge(edge)?;
        Ok(id)
    }

    /// Removes a dependency edge
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Result<DependencyEdge, ScheduleError> {
        let (idx, edge) = self
            .edges
            .remove(edge_id)
            .ok_or_else(|| ScheduleError::EdgeNotFound(edge_id.clone()))?;
        self.graph.remove_edge(idx);
        Ok(edge)
    }

    pub fn edge(&self, edge_id: &EdgeId) -> Result<&DependencyEdge, ScheduleError> {
        self.edges
            .get(edge_id)
            .map(|(_, edge)| edge)
            .ok_or_else(|| ScheduleError::EdgeNotFound(edge_id.clone()))
    }

    fn edges_directed(
        &self,
        task_id: &TaskId,
        direction: Direction,
    ) -> Result<Vec<&DependencyEdge>, ScheduleError> {
        let idx = self.node(task_id)?;
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .filter_map(|e| self.edges.get(e.weight()).map(|(_, edge)| edge))
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(edges)
    }

    /// Edges where the task is the successor
    pub fn predecessors_of(&self, task_id: &TaskId) -> Result<Vec<&DependencyEdge>, ScheduleError> {
        self.edges_directed(task_id, Direction::Incoming)
    }

    /// Edges where the task is the predecessor
    pub fn successors_of(&self, task_id: &TaskId) -> Result<Vec<&DependencyEdge>, ScheduleError> {
        self.edges_directed(task_id, Direction::Outgoing)
    }

    /// Copies a task and its neighbourhood out of the graph
    pub fn snapshot(&self, task_id: &TaskId) -> Result<TaskSnapshot, ScheduleError> {
        let task = self.task(task_id)?.clone();

        let predecessors = self
            .predecessors_of(task_id)?
            .into_iter()
            .map(|edge| {
                Ok(EdgeContext {
                    edge: edge.clone(),
                    counterpart: self.task(&edge.predecessor)?.clone(),
                })
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        let successors = self
            .successors_of(task_id)?
            .into_iter()
            .map(|edge| {
                Ok(EdgeContext {
                    edge: edge.clone(),
                    counterpart: self.task(&edge.successor)?.clone(),
                })
            })
            .collect::<Result<Vec<_>, ScheduleError>>()?;

        Ok(TaskSnapshot {
            task,
            predecessors,
            successors,
        })
    }

    /// Task IDs reachable from `task_id` through successor edges, excluding itself
    pub fn downstream_of(&self, task_id: &TaskId) -> Result<Vec<TaskId>, ScheduleError> {
        let start = self.node(task_id)?;
        let mut dfs = petgraph::visit::Dfs::new(&self.graph, start);
        let mut reached = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                if let Some(id) = self.graph.node_weight(idx) {
                    reached.push(id.clone());
                }
            }
        }
        Ok(reached)
    }

    /// Returns all task IDs in topological order (predecessors first)
    pub fn topological_order(&self) -> Result<Vec<TaskId>, ScheduleError> {
        toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
            .map_err(|cycle| {
                // Unreachable while add_edge keeps the graph acyclic
                let at = self
                    .graph
                    .node_weight(cycle.node_id())
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                ScheduleError::Unresolvable(format!("dependency graph has a cycle at {}", at))
            })
    }

    /// Commits a batch of new date ranges
    pub fn apply(
        &mut self,
        plan: impl IntoIterator<Item = (TaskId, DateRange)>,
    ) -> Result<(), ScheduleError> {
        for (task_id, dates) in plan {
            self.set_dates(&task_id, dates)?;
        }
        Ok(())
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.contains_key(task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over tasks in ID order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        let mut tasks: Vec<_> = self.tasks.values().map(|(_, task)| task).collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        tasks.into_iter()
    }

    /// Iterates over edges in ID order
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        let mut edges: Vec<_> = self.edges.values().map(|(_, edge)| edge).collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::edge::{Lag, RelationType};
    use chrono::NaiveDate;

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn fs(pred: &str, succ: &str) -> DependencyEdge {
        DependencyEdge::with_id(
            format!("{}-{}", pred, succ).parse().unwrap(),
            id(pred),
            id(succ),
            RelationType::FinishToStart,
            Lag::default(),
        )
    }

    fn graph_with(ids: &[&str]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for s in ids {
            graph.add_task(Task::new(id(s), *s)).unwrap();
        }
        graph
    }

    #[test]
    fn empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn add_task_upserts() {
        let mut graph = graph_with(&["a"]);
        let mut renamed = Task::new(id("a"), "Renamed");
        renamed.status = TaskStatus::Doing;
        graph.add_task(renamed).unwrap();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.task(&id("a")).unwrap().title, "Renamed");
    }

    #[test]
    fn add_task_rejects_inverted_dates() {
        let mut graph = DependencyGraph::new();
        let mut task = Task::new(id("a"), "a");
        task.start_date = NaiveDate::from_ymd_opt(2025, 1, 5);
        task.deadline = NaiveDate::from_ymd_opt(2025, 1, 1);
        assert!(matches!(
            graph.add_task(task),
            Err(ScheduleError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn predecessor_and_successor_lookup() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.add_edge(fs("b", "c")).unwrap();

        let preds = graph.predecessors_of(&id("b")).unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].predecessor, id("a"));

        let succs = graph.successors_of(&id("b")).unwrap();
        assert_eq!(succs.len(), 1);
        assert_eq!(succs[0].successor, id("c"));

        assert!(graph.predecessors_of(&id("a")).unwrap().is_empty());
    }

    #[test]
    fn unknown_task_returns_not_found() {
        let mut graph = graph_with(&["a"]);
        let err = graph.add_edge(fs("a", "ghost")).unwrap_err();
        assert_eq!(err, ScheduleError::TaskNotFound(id("ghost")));
        assert!(err.is_not_found());

        assert!(matches!(
            graph.predecessors_of(&id("ghost")),
            Err(ScheduleError::TaskNotFound(_))
        ));
    }

    #[test]
    fn unknown_edge_returns_not_found() {
        let mut graph = graph_with(&["a"]);
        let err = graph.remove_edge(&"nope".parse().unwrap()).unwrap_err();
        assert!(matches!(err, ScheduleError::EdgeNotFound(_)));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.add_edge(fs("b", "c")).unwrap();

        let result = graph.add_edge(fs("c", "a"));
        assert!(matches!(result, Err(ScheduleError::CycleDetected { .. })));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn self_dependency_rejected() {
        let mut graph = graph_with(&["a"]);
        let result = graph.add_edge(fs("a", "a"));
        assert!(matches!(result, Err(ScheduleError::SelfDependency(_))));
    }

    #[test]
    fn duplicate_pair_rejected() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(fs("a", "b")).unwrap();

        let mut second = fs("a", "b");
        second.id = "other".parse().unwrap();
        second.relation = RelationType::StartToStart;
        assert!(matches!(
            graph.add_edge(second),
            Err(ScheduleError::DuplicateEdge(_))
        ));
    }

    #[test]
    fn link_validates_raw_input() {
        let mut graph = graph_with(&["a", "b"]);

        let err = graph.link(&id("a"), &id("b"), "FS", 400, true).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidLag(400));

        let err = graph.link(&id("a"), &id("b"), "AB", 0, true).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRelation(_)));
        assert_eq!(graph.edge_count(), 0);

        let edge_id = graph.link(&id("a"), &id("b"), "ss", -1, false).unwrap();
        let edge = graph.edge(&edge_id).unwrap();
        assert_eq!(edge.relation, RelationType::StartToStart);
        assert!(!edge.mandatory);
    }

    #[test]
    fn remove_task_drops_incident_edges() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.add_edge(fs("b", "c")).unwrap();

        graph.remove_task(&id("b")).unwrap();
        assert!(!graph.contains(&id("b")));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.successors_of(&id("a")).unwrap().is_empty());
        assert!(graph.predecessors_of(&id("c")).unwrap().is_empty());
    }

    #[test]
    fn remove_edge_allows_reverse_link() {
        let mut graph = graph_with(&["a", "b"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.remove_edge(&"a-b".parse().unwrap()).unwrap();

        graph.add_edge(fs("b", "a")).unwrap();
        assert_eq!(graph.successors_of(&id("b")).unwrap().len(), 1);
    }

    #[test]
    fn snapshot_carries_counterparts() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.add_edge(fs("b", "c")).unwrap();

        let snap = graph.snapshot(&id("b")).unwrap();
        assert_eq!(snap.task.id, id("b"));
        assert_eq!(snap.predecessors[0].counterpart.id, id("a"));
        assert_eq!(snap.successors[0].counterpart.id, id("c"));
    }

    #[test]
    fn topological_order() {
        let mut graph = graph_with(&["a", "b", "c"]);
        graph.add_edge(fs("c", "b")).unwrap();
        graph.add_edge(fs("b", "a")).unwrap();

        let order = graph.topological_order().unwrap();
        let pos = |s: &str| order.iter().position(|t| t == &id(s)).unwrap();
        assert!(pos("c") < pos("b"));
        assert!(pos("b") < pos("a"));
    }

    #[test]
    fn downstream_follows_chain() {
        let mut graph = graph_with(&["a", "b", "c", "d"]);
        graph.add_edge(fs("a", "b")).unwrap();
        graph.add_edge(fs("b", "c")).unwrap();

        let mut reached = graph.downstream_of(&id("a")).unwrap();
        reached.sort();
        assert_eq!(reached, vec![id("b"), id("c")]);
    }

    #[test]
    fn from_parts() {
        let tasks = vec![Task::new(id("a"), "A"), Task::new(id("b"), "B")];
        let graph = DependencyGraph::from_parts(tasks, vec![fs("a", "b")]).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().count(), 1);
    }

    #[test]
    fn performance_500_tasks() {
        use std::time::Instant;

        let ids: Vec<String> = (0..500).map(|i| format!("t{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut graph = graph_with(&refs);

        let start = Instant::now();
        for pair in refs.windows(2) {
            graph.add_edge(fs(pair[0], pair[1])).unwrap();
        }
        let _ = graph.topological_order().unwrap();
        let duration = start.elapsed();

        assert!(duration.as_millis() < 2000, "Building chain took {:?}", duration);
    }
}
