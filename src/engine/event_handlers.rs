// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::info;

use crate::dag::{ScheduledTask, Scheduler, TaskId};
use crate::engine::TaskOutcome;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand these tasks to their runners.
    DispatchTasks(Vec<ScheduledTask>),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_dispatch(scheduler: &Scheduler<'_>, tasks: Vec<ScheduledTask>) -> Self {
        let mut commands = Vec::new();
        if !tasks.is_empty() {
            commands.push(CoreCommand::DispatchTasks(tasks));
        }
        Self {
            commands,
            keep_running: !scheduler.is_finished(),
        }
    }
}

/// Seed the run with every initially eligible node.
pub fn handle_start(scheduler: &mut Scheduler<'_>) -> CoreStep {
    let ready = scheduler.start();
    CoreStep::from_dispatch(scheduler, ready)
}

/// Apply a runner outcome and dispatch whatever it unblocked.
pub fn handle_task_completion(
    scheduler: &mut Scheduler<'_>,
    task: TaskId,
    outcome: TaskOutcome,
) -> CoreStep {
    let ready = scheduler.handle_completion(&task, outcome);
    CoreStep::from_dispatch(scheduler, ready)
}

/// Stop dispatching; keep running only until in-flight tasks report back.
pub fn handle_shutdown(scheduler: &mut Scheduler<'_>) -> CoreStep {
    let cancelled = scheduler.request_shutdown();
    let in_flight = scheduler.running_count();
    if in_flight > 0 {
        info!(
            in_flight,
            cancelled = cancelled.len(),
            "waiting for running tasks to finish"
        );
    }
    CoreStep::from_dispatch(scheduler, Vec::new())
}
