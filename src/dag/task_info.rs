// src/dag/task_info.rs

//! Per-node run status and scheduled task types.

use std::fmt;

use crate::dag::node::TaskId;

/// Status of a node within one invocation.
///
/// `Pending → {Satisfied | Running}`, `Running → {Succeeded | Failed}`.
/// `Skipped` (an upstream node failed) and `Cancelled` (shutdown before
/// dispatch) are reached only from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Needed for the goal but not yet dispatched.
    Pending,
    /// Output already present before the run; never dispatched.
    Satisfied,
    /// Handed to a runner, result outstanding.
    Running,
    Succeeded,
    Failed,
    /// Never dispatched because a dependency failed.
    Skipped,
    /// Never dispatched because shutdown was requested.
    Cancelled,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, NodeStatus::Pending | NodeStatus::Running)
    }

    /// Whether a dependency in this status lets its dependents run.
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, NodeStatus::Satisfied | NodeStatus::Succeeded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Satisfied => "satisfied",
            NodeStatus::Running => "running",
            NodeStatus::Succeeded => "succeeded",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
            NodeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of a node that the scheduler wants a runner to execute now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    /// Direct dependencies, all `Satisfied` or `Succeeded` at dispatch time.
    pub deps: Vec<TaskId>,
}
