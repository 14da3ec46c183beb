//! Task CLI commands

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Subcommand;
use tracing::{info, warn};

use super::check::{render_blocked, suggest_fix};
use super::output::Output;
use super::parse_range;
use crate::domain::{
    blocking_flags, check_project_bounds, check_transition, inclusive_days, resolve, validate_edit,
    EdgeRole, FixScope, Task, TaskId, ViolationReport,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   depgate task add "Design schema"
    ///   depgate task add "Build API" --start 2025-01-06 --end 2025-01-17
    Add {
        /// Task title
        title: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Deadline (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Initial status (todo, doing, done or a configured alias)
        #[arg(long)]
        status: Option<String>,

        /// Longer description
        #[arg(long)]
        description: Option<String>,
    },

    /// List all tasks
    List,

    /// Show task details and which dependencies block it
    Show {
        /// Task ID
        id: String,
    },

    /// Remove a task and every dependency touching it
    Remove {
        /// Task ID
        id: String,
    },

    /// Change a task's status, subject to its dependencies
    Status {
        /// Task ID
        id: String,

        /// New status (todo, doing, done or a configured alias)
        status: String,

        /// Override blocking mandatory dependencies (needs policy.allow_force)
        #[arg(long)]
        force: bool,
    },

    /// Change a task's dates, subject to its dependencies and the project range
    Dates {
        /// Task ID
        id: String,

        /// New start date (YYYY-MM-DD)
        start: String,

        /// New deadline (YYYY-MM-DD)
        end: String,

        /// Keep the dates despite mandatory violations (needs policy.allow_force)
        #[arg(long, conflicts_with = "auto_fix")]
        force: bool,

        /// Move the task to the nearest dates that satisfy its dependencies
        #[arg(long)]
        auto_fix: bool,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            start,
            end,
            status,
            description,
        } => add_task(
            output,
            &title,
            start.as_deref().zip(end.as_deref()),
            status.as_deref(),
            description,
        ),
        TaskCommands::List => list_tasks(output),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Remove { id } => remove_task(output, &id),
        TaskCommands::Status { id, status, force } => set_status(output, &id, &status, force),
        TaskCommands::Dates {
            id,
            start,
            end,
            force,
            auto_fix,
        } => set_dates(output, &id, &start, &end, force, auto_fix),
    }
}

fn add_task(
    output: &Output,
    title: &str,
    dates: Option<(&str, &str)>,
    status: Option<&str>,
    description: Option<String>,
) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let config = &project.config().project;

    let mut task = Task::new(TaskId::generate(title, Utc::now()), title);
    task.description = description;

    if let Some(raw) = status {
        task.status = config.status_normalizer().normalize(raw)?;
    }

    if let Some((start, end)) = dates {
        let dates = parse_range(start, end)?;
        if let Some(bounds) = config.project.range()? {
            let violations = check_project_bounds(&task.id, dates, bounds);
            if !violations.is_empty() {
                let report = ViolationReport::new(violations, false);
                render_blocked(output, &task.id, dates, &report, None);
                bail!("Task dates fall outside the project range {}", bounds);
            }
        }
        task = task.with_dates(dates);
    }

    graph.add_task(task.clone())?;
    project.task_store().append(&task)?;
    info!(task = %task.id, "added task");

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.read_lock()?;
    let graph = project.load_graph()?;

    if output.is_json() {
        let tasks: Vec<_> = graph.tasks().collect();
        output.data(&tasks);
        return Ok(());
    }

    if graph.is_empty() {
        output.success("No tasks");
        return Ok(());
    }

    for task in graph.tasks() {
        let dates = task
            .dates()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "unscheduled".to_string());
        output.row(&[task.id.as_str(), task.status.as_str(), &dates, &task.title]);
    }

    Ok(())
}

fn show_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.read_lock()?;
    let graph = project.load_graph()?;
    let task_id: TaskId = id_str.parse()?;

    let snapshot = graph.snapshot(&task_id)?;
    let flags = blocking_flags(&snapshot);

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": snapshot.task,
            "dependencies": flags,
        }));
        return Ok(());
    }

    let task = &snapshot.task;
    println!("ID:       {}", task.id);
    println!("Title:    {}", task.title);
    println!("Status:   {}", task.status.label());
    match task.dates() {
        Some(dates) => println!(
            "Dates:    {} ({} days)",
            dates,
            inclusive_days(dates.start(), dates.end())
        ),
        None => println!("Dates:    unscheduled"),
    }
    if let Some(description) = &task.description {
        println!();
        println!("{}", description);
    }

    if flags.is_empty() {
        return Ok(());
    }

    println!();
    println!("Dependencies:");
    let edges = snapshot.predecessors.iter().chain(snapshot.successors.iter());
    for (ctx, flag) in edges.zip(&flags) {
        let direction = match flag.role {
            EdgeRole::Successor => "after ",
            EdgeRole::Predecessor => "before",
        };
        let mut notes = Vec::new();
        if !flag.mandatory {
            notes.push("optional");
        }
        if flag.blocking && flag.role == EdgeRole::Successor {
            notes.push("blocking");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        println!(
            "  {} {} {} {}{}  ({})",
            direction,
            ctx.counterpart.id,
            ctx.edge.relation.code(),
            ctx.edge.lag,
            notes,
            ctx.edge.id
        );
    }

    Ok(())
}

fn remove_task(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let task_id: TaskId = id_str.parse()?;

    let edges_before = graph.edge_count();
    let task = graph.remove_task(&task_id)?;
    let dropped = edges_before - graph.edge_count();
    project.save_graph(&graph)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": task.id,
            "dependencies_removed": dropped,
        }));
    } else {
        output.success(&format!(
            "Removed task: {} ({} dependencies dropped)",
            task.id, dropped
        ));
    }

    Ok(())
}

fn set_status(output: &Output, id_str: &str, raw_status: &str, force: bool) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let config = &project.config().project;
    let task_id: TaskId = id_str.parse()?;

    let target = config.status_normalizer().normalize(raw_status)?;
    let snapshot = graph.snapshot(&task_id)?;
    let decision = check_transition(&snapshot, target);

    let forced = !decision.allowed;
    if forced && !(force && config.policy.allow_force) {
        if output.is_json() {
            output.data(&serde_json::json!({
                "applied": false,
                "decision": decision,
                "can_force": config.policy.allow_force,
            }));
        } else {
            println!("Cannot move {} to {}:", task_id, target);
            for violation in &decision.violations {
                output.violation(violation);
            }
            if config.policy.allow_force {
                println!("Use --force to override.");
            }
        }
        bail!("Status change for {} blocked by its dependencies", task_id);
    }

    graph.set_status(&task_id, target)?;
    project.save_graph(&graph)?;

    if forced {
        warn!(task = %task_id, to = %target, "status change forced past blocking dependencies");
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "applied": true,
            "forced": forced,
            "decision": decision,
        }));
    } else {
        if forced {
            output.warn("mandatory dependencies overridden");
        }
        for violation in &decision.violations {
            output.violation(violation);
        }
        output.success(&format!("{} is now {}", task_id, target.label()));
    }

    Ok(())
}

fn set_dates(
    output: &Output,
    id_str: &str,
    start: &str,
    end: &str,
    force: bool,
    auto_fix: bool,
) -> Result<()> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;
    let config = &project.config().project;
    let task_id: TaskId = id_str.parse()?;

    let proposed = parse_range(start, end)?;
    let bounds = config.project.range()?;
    let policy = &config.policy;

    let snapshot = graph.snapshot(&task_id)?;
    let report = ViolationReport::new(
        validate_edit(&snapshot, proposed, bounds),
        policy.allow_force,
    );

    let (dates, report, forced) = if !report.is_blocked() {
        (proposed, report, false)
    } else if auto_fix && report.date_validation.is_empty() {
        let fixed = resolve(
            &snapshot,
            proposed,
            policy.max_fix_iterations,
            FixScope::MandatoryOnly,
        )?;
        let after = ViolationReport::new(validate_edit(&snapshot, fixed, bounds), policy.allow_force);
        if after.is_blocked() {
            render_blocked(output, &task_id, fixed, &after, None);
            bail!("Auto-fixed dates for {} still violate constraints", task_id);
        }
        (fixed, after, false)
    } else if report.can_proceed(force) {
        (proposed, report, true)
    } else {
        let fix = if report.date_validation.is_empty() {
            suggest_fix(&snapshot, proposed, policy.max_fix_iterations)
        } else {
            None
        };
        render_blocked(output, &task_id, proposed, &report, fix);
        bail!(
            "Date change for {} blocked by {} violation(s)",
            task_id,
            report.date_validation.len() + report.mandatory.len()
        );
    };

    graph.set_dates(&task_id, dates)?;
    project.save_graph(&graph)?;

    if forced {
        warn!(task = %task_id, dates = %dates, "date change forced past mandatory dependencies");
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "applied": true,
            "task_id": task_id,
            "dates": dates,
            "auto_fixed": dates != proposed,
            "forced": forced,
            "report": report,
        }));
    } else {
        if forced {
            output.warn("mandatory dependencies overridden");
            for violation in &report.mandatory {
                output.violation(violation);
            }
        }
        for violation in &report.optional {
            output.violation(violation);
        }
        output.success(&format!("Updated {}: {}", task_id, dates));
    }

    Ok(())
}
