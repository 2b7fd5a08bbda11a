// src/engine/report.rs

use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::dag::{NodeStatus, TaskId};
use crate::exec::RunnerError;

/// Terminal outcome of one planned node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub status: NodeStatus,
    /// Set for `Failed` nodes.
    pub error: Option<RunnerError>,
    /// For `Skipped` nodes: the failed upstream node.
    pub blocked_by: Option<TaskId>,
}

/// Per-node result of one invocation.
///
/// Only nodes needed for the goals appear; dependencies hidden behind a
/// satisfied node were never considered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub goals: Vec<TaskId>,
    pub nodes: BTreeMap<TaskId, NodeReport>,
}

impl ExecutionReport {
    pub fn status_of(&self, id: &TaskId) -> Option<NodeStatus> {
        self.nodes.get(id).map(|n| n.status)
    }

    pub fn count(&self, status: NodeStatus) -> usize {
        self.nodes.values().filter(|n| n.status == status).count()
    }

    pub fn with_status(&self, status: NodeStatus) -> impl Iterator<Item = (&TaskId, &NodeReport)> {
        self.nodes.iter().filter(move |(_, n)| n.status == status)
    }

    pub fn has_failures(&self) -> bool {
        self.count(NodeStatus::Failed) > 0
    }

    /// Whether any node was left undone by a shutdown.
    pub fn was_cancelled(&self) -> bool {
        self.count(NodeStatus::Cancelled) > 0
    }

    /// Process exit status: 0 when every planned node is satisfied or succeeded.
    pub fn exit_code(&self) -> u8 {
        if self.has_failures() || self.was_cancelled() {
            1
        } else {
            0
        }
    }

    /// Log counts, then every failed and skipped node with its cause.
    pub fn log_summary(&self) {
        info!(
            planned = self.nodes.len(),
            satisfied = self.count(NodeStatus::Satisfied),
            succeeded = self.count(NodeStatus::Succeeded),
            failed = self.count(NodeStatus::Failed),
            skipped = self.count(NodeStatus::Skipped),
            cancelled = self.count(NodeStatus::Cancelled),
            "execution finished"
        );

        for (id, node) in self.with_status(NodeStatus::Failed) {
            match &node.error {
                Some(err) => error!(task = %id, kind = %err.kind, "failed: {}", err.message),
                None => error!(task = %id, "failed"),
            }
        }

        for (id, node) in self.with_status(NodeStatus::Skipped) {
            match &node.blocked_by {
                Some(upstream) => {
                    warn!(task = %id, upstream = %upstream, "skipped: dependency failed")
                }
                None => warn!(task = %id, "skipped: dependency failed"),
            }
        }

        let cancelled = self.count(NodeStatus::Cancelled);
        if cancelled > 0 {
            warn!(cancelled, "tasks not started because of shutdown");
        }
    }
}
