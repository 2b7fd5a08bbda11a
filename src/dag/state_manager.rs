// src/dag/state_manager.rs

//! Status transitions that look at more than one node.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskId;
use crate::dag::task_info::NodeStatus;

/// Mutable view over the per-node statuses of one invocation.
///
/// Nodes absent from `states` are outside the plan (not needed for the goal,
/// or hidden behind a satisfied node) and are never touched.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    states: &'a mut BTreeMap<TaskId, NodeStatus>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a TaskGraph, states: &'a mut BTreeMap<TaskId, NodeStatus>) -> Self {
        Self { graph, states }
    }

    /// Whether every dependency of `id` is `Satisfied` or `Succeeded`.
    pub fn deps_satisfied(&self, id: &TaskId) -> bool {
        ReadOnlyStateManager::new(self.graph, self.states).deps_satisfied(id)
    }

    /// Mark every pending node downstream of `failed` as `Skipped`.
    ///
    /// Returns the newly skipped nodes, excluding `failed` itself.
    pub fn mark_dependents_skipped(&mut self, failed: &TaskId) -> Vec<TaskId> {
        let mut stack: Vec<TaskId> = self.graph.dependents_of(failed).cloned().collect();
        let mut newly_skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if let Some(status) = self.states.get_mut(&id) {
                if *status == NodeStatus::Pending {
                    *status = NodeStatus::Skipped;
                    debug!(task = %id, upstream = %failed, "skipping dependent of failed task");
                    stack.extend(self.graph.dependents_of(&id).cloned());
                    newly_skipped.push(id);
                }
            }
        }

        newly_skipped
    }

    /// Pending dependents of `id` whose dependencies are now all satisfied.
    pub fn newly_ready_dependents(&self, id: &TaskId) -> Vec<TaskId> {
        self.graph
            .dependents_of(id)
            .filter(|dep| self.states.get(*dep) == Some(&NodeStatus::Pending))
            .filter(|dep| self.deps_satisfied(dep))
            .cloned()
            .collect()
    }

    pub fn set(&mut self, id: &TaskId, status: NodeStatus) {
        match self.states.get_mut(id) {
            Some(current) => *current = status,
            None => warn!(task = %id, %status, "status update for task outside the plan; ignoring"),
        }
    }
}

/// Read-only counterpart of [`StateManager`].
pub struct ReadOnlyStateManager<'a> {
    graph: &'a TaskGraph,
    states: &'a BTreeMap<TaskId, NodeStatus>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a TaskGraph, states: &'a BTreeMap<TaskId, NodeStatus>) -> Self {
        Self { graph, states }
    }

    pub fn deps_satisfied(&self, id: &TaskId) -> bool {
        for dep in self.graph.dependencies_of(id) {
            match self.states.get(dep) {
                Some(status) if status.satisfies_dependents() => {}
                Some(_) => return false,
                None => {
                    warn!(task = %id, dep = %dep, "dependency missing from plan");
                    return false;
                }
            }
        }
        true
    }
}
