//! Task management commands for CLI.

use clap::Subcommand;
use serde_json::json;
use sisyphus_core::{NewTask, TaskPatch};

use super::{flush_notices, print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Add {
        /// Task title
        title: String,
        /// Project name (default: "No Project")
        #[arg(long)]
        project: Option<String>,
        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
        /// Estimated work intervals
        #[arg(long, default_value = "1")]
        estimate: u32,
    },
    /// List tasks, newest first
    List {
        /// Only tasks in this project
        #[arg(long)]
        project: Option<String>,
        /// Include finished tasks
        #[arg(long)]
        all: bool,
    },
    /// Update a task
    Update {
        /// Task ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        estimate: Option<u32>,
        /// Overwrite the completed-interval count
        #[arg(long)]
        completed: Option<u32>,
        #[arg(long)]
        done: Option<bool>,
    },
    /// Delete a task. Recorded sessions keep its name.
    Delete {
        /// Task ID
        id: String,
    },
    /// Toggle a task between done and not done
    Done {
        /// Task ID
        id: String,
    },
    /// Credit work intervals to this task
    Activate {
        /// Task ID
        id: String,
    },
    /// Stop crediting work intervals to any task
    Deactivate,
    /// List project names and open-task totals
    Projects,
}

pub fn run(ctx: &Context, action: TaskAction) -> CliResult {
    let mut tracker = ctx.tracker()?;

    match action {
        TaskAction::Add {
            title,
            project,
            notes,
            estimate,
        } => {
            let mut input = NewTask::new(title).notes(notes).estimate(estimate);
            if let Some(project) = project {
                input = input.project(project);
            }
            let task = tracker.add_task(input)?;
            print_json(&task)?;
        }
        TaskAction::List { project, all } => {
            let tasks: Vec<_> = tracker
                .tasks()
                .iter()
                .filter(|t| all || !t.is_done)
                .filter(|t| project.as_deref().map_or(true, |p| t.project_name == p))
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Update {
            id,
            title,
            project,
            notes,
            estimate,
            completed,
            done,
        } => {
            let patch = TaskPatch {
                id: None,
                project_name: project,
                title,
                notes,
                estimated_intervals: estimate,
                completed_intervals: completed,
                is_done: done,
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            let task = tracker.update_task(&id, &patch)?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            let task = tracker.delete_task(&id)?;
            print_json(&json!({ "deleted": task.id }))?;
        }
        TaskAction::Done { id } => {
            let task = tracker.toggle_task_done(&id)?;
            print_json(&task)?;
        }
        TaskAction::Activate { id } => {
            tracker.set_active_task(Some(&id))?;
            print_json(&tracker.snapshot())?;
        }
        TaskAction::Deactivate => {
            tracker.set_active_task(None)?;
            print_json(&tracker.snapshot())?;
        }
        TaskAction::Projects => {
            print_json(&json!({
                "projects": tracker.projects(),
                "summary": tracker.task_summary(),
            }))?;
        }
    }

    flush_notices(&mut tracker);
    Ok(())
}
