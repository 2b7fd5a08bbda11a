// src/dag/scheduler_step.rs

//! Step-by-step result type for the scheduler.

use crate::dag::node::TaskId;
use crate::dag::task_info::ScheduledTask;

/// Structured result of a single scheduler "step".
///
/// Tests use this to step the scheduler by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks dispatched to runners as a result of this step.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks newly marked `Skipped` because of a failure in this step.
    pub newly_skipped: Vec<TaskId>,
    /// Whether this step left every planned node in a terminal status.
    pub run_just_finished: bool,
}
