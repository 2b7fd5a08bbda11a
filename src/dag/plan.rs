// src/dag/plan.rs

//! Goal closure and satisfaction filtering.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, info};

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskId;
use crate::dag::task_info::NodeStatus;
use crate::errors::{Result, VxError};

/// Answers whether a node's output is already in place.
pub trait SatisfactionCheck {
    fn is_satisfied(&self, id: &TaskId) -> bool;
}

/// Treats every node in the set as satisfied.
impl SatisfactionCheck for BTreeSet<TaskId> {
    fn is_satisfied(&self, id: &TaskId) -> bool {
        self.contains(id)
    }
}

/// The nodes one invocation needs, split into satisfied and to-run.
///
/// This is the outcome of the dry check and the starting state of the
/// scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub goals: Vec<TaskId>,
    /// Every planned node, either `Satisfied` or `Pending`.
    pub statuses: BTreeMap<TaskId, NodeStatus>,
    /// Pending nodes in dependency order.
    pub order: Vec<TaskId>,
}

impl Plan {
    /// Walk dependencies breadth-first from `goals`, querying `check` once per
    /// reached node.
    ///
    /// A satisfied node is recorded as `Satisfied` and its own dependencies are
    /// not visited; everything else is `Pending`.
    pub fn compute(
        graph: &TaskGraph,
        goals: &[TaskId],
        check: &dyn SatisfactionCheck,
    ) -> Result<Self> {
        for goal in goals {
            if !graph.contains(goal) {
                return Err(VxError::GraphConstruction(format!(
                    "goal task {goal} is not part of the task graph"
                )));
            }
        }

        let mut statuses: BTreeMap<TaskId, NodeStatus> = BTreeMap::new();
        let mut queue: VecDeque<TaskId> = goals.iter().cloned().collect();

        while let Some(id) = queue.pop_front() {
            if statuses.contains_key(&id) {
                continue;
            }

            if check.is_satisfied(&id) {
                debug!(task = %id, "output present; marking Satisfied");
                statuses.insert(id, NodeStatus::Satisfied);
                continue;
            }

            queue.extend(
                graph
                    .dependencies_of(&id)
                    .filter(|dep| !statuses.contains_key(*dep))
                    .cloned(),
            );
            statuses.insert(id, NodeStatus::Pending);
        }

        let pending: BTreeSet<TaskId> = statuses
            .iter()
            .filter(|(_, status)| **status == NodeStatus::Pending)
            .map(|(id, _)| id.clone())
            .collect();
        let order = graph.topological_order(&pending)?;

        let plan = Self {
            goals: goals.to_vec(),
            statuses,
            order,
        };

        info!(
            goals = plan.goals.len(),
            planned = plan.statuses.len(),
            satisfied = plan.satisfied().count(),
            to_run = plan.order.len(),
            "computed execution plan"
        );

        Ok(plan)
    }

    /// Nodes that must run, dependencies first.
    pub fn to_run(&self) -> &[TaskId] {
        &self.order
    }

    pub fn satisfied(&self) -> impl Iterator<Item = &TaskId> {
        self.statuses
            .iter()
            .filter(|(_, status)| **status == NodeStatus::Satisfied)
            .map(|(id, _)| id)
    }

    pub fn status_of(&self, id: &TaskId) -> Option<NodeStatus> {
        self.statuses.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Whether nothing needs to run.
    pub fn is_complete(&self) -> bool {
        self.order.is_empty()
    }
}
