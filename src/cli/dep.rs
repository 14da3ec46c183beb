//! Dependency CLI commands

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use super::output::Output;
use crate::domain::{check_dates, DependencyEdge, EdgeId, TaskId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Add a dependency: SUCCESSOR waits on PREDECESSOR
    ///
    /// Examples:
    ///   depgate dep add t-1111111 t-2222222                # finish-to-start
    ///   depgate dep add t-1111111 t-2222222 --type SS --lag -1
    Add {
        /// Task that goes first
        predecessor: String,

        /// Task that waits
        successor: String,

        /// Relation: FS, SS, FF or SF
        #[arg(long = "type", short = 't', default_value = "FS")]
        relation: String,

        /// Days of lag (negative for lead), between -365 and 365
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        lag: i64,

        /// Report violations of this edge without blocking
        #[arg(long)]
        optional: bool,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// Remove a dependency by its ID
    Remove {
        /// Dependency ID
        id: String,
    },

    /// List dependencies
    List {
        /// Only dependencies touching this task
        #[arg(long)]
        task: Option<String>,
    },
}

pub fn run(cmd: DepCommands, output: &Output) -> Result<()> {
    match cmd {
        DepCommands::Add {
            predecessor,
            successor,
            relation,
            lag,
            optional,
            note,
        } => add_dependency(output, &predecessor, &successor, &relation, lag, !optional, note),
        DepCommands::Remove { id } => remove_dependency(output, &id),
        DepCommands::List { task } => list_dependencies(output, task.as_deref()),
    }
}

fn add_dependency(
    output: &Output,
    predecessor: &str,
    successor: &str,
    relation: &str,
    lag: i64,
    mandatory: bool,
    note: Option<String>,
) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;

    let predecessor: TaskId = predecessor.parse()?;
    let successor: TaskId = successor.parse()?;

    let mut edge = DependencyEdge::parse(
        predecessor,
        successor.clone(),
        relation,
        lag,
        mandatory,
        Utc::now(),
    )?;
    edge.note = note;

    graph.add_edge(edge.clone())?;
    project.edge_store().append(&edge)?;
    info!(edge = %edge.id, "added dependency");

    // The edge is stored either way; existing dates that break it are reported
    let snapshot = graph.snapshot(&successor)?;
    let violations: Vec<_> = match snapshot.task.dates() {
        Some(dates) => check_dates(&snapshot, dates)
            .into_iter()
            .filter(|v| v.edge_id.as_ref() == Some(&edge.id))
            .collect(),
        None => Vec::new(),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "edge": edge,
            "violations": violations,
        }));
        return Ok(());
    }

    output.success(&format!(
        "Added {}: {} -> {} ({} {}{})",
        edge.id,
        edge.predecessor,
        edge.successor,
        edge.relation.code(),
        edge.lag,
        if edge.mandatory { "" } else { ", optional" }
    ));
    if !violations.is_empty() {
        output.warn(&format!(
            "current dates already violate this dependency; try 'depgate reschedule {}'",
            edge.predecessor
        ));
        for violation in &violations {
            output.violation(violation);
        }
    }

    Ok(())
}

fn remove_dependency(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let edge_id: EdgeId = id_str.parse()?;

    let edge = graph.remove_edge(&edge_id)?;
    project.save_graph(&graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({ "removed": edge }));
    } else {
        output.success(&format!(
            "Removed {}: {} -> {}",
            edge.id, edge.predecessor, edge.successor
        ));
    }

    Ok(())
}

fn list_dependencies(output: &Output, task: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.read_lock()?;
    let graph = project.load_graph()?;

    let edges: Vec<&DependencyEdge> = match task {
        Some(raw) => {
            let task_id: TaskId = raw.parse()?;
            let mut edges = graph.predecessors_of(&task_id)?;
            edges.extend(graph.successors_of(&task_id)?);
            edges
        }
        None => graph.edges().collect(),
    };

    if output.is_json() {
        output.data(&edges);
        return Ok(());
    }

    if edges.is_empty() {
        output.success("No dependencies");
        return Ok(());
    }

    for edge in edges {
        let lag = edge.lag.to_string();
        let kind = if edge.mandatory { "mandatory" } else { "optional" };
        output.row(&[
            edge.id.as_str(),
            edge.predecessor.as_str(),
            edge.relation.code(),
            edge.successor.as_str(),
            &lag,
            kind,
        ]);
    }

    Ok(())
}
