use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::node::TaskId;
use crate::dag::plan::Plan;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{NodeStatus, ScheduledTask};
use crate::engine::report::{ExecutionReport, NodeReport};
use crate::engine::TaskOutcome;
use crate::exec::RunnerError;

/// Scheduler holds a borrowed graph plus the mutable state of one invocation.
///
/// It is responsible for:
/// - deciding when a pending node is ready (every dependency satisfied)
/// - keeping at most `max_concurrency` nodes running, queueing the rest
/// - marking nodes as succeeded/failed and releasing their dependents
/// - skipping the downstream nodes of a failure
/// - cancelling undispatched nodes on shutdown
///
/// It performs no IO; the runtime feeds it completions and executes the
/// tasks it returns.
#[derive(Debug)]
pub struct Scheduler<'g> {
    graph: &'g TaskGraph,
    goals: Vec<TaskId>,
    states: BTreeMap<TaskId, NodeStatus>,
    /// Pending nodes of `order` with all dependencies satisfied, not yet dispatched.
    ready: VecDeque<TaskId>,
    queued: HashSet<TaskId>,
    order: Vec<TaskId>,
    running: usize,
    max_concurrency: usize,
    draining: bool,
    errors: BTreeMap<TaskId, RunnerError>,
    blocked_by: BTreeMap<TaskId, TaskId>,
}

impl<'g> Scheduler<'g> {
    /// Build a scheduler for `plan`. A `max_concurrency` of zero is treated as one.
    pub fn new(graph: &'g TaskGraph, plan: Plan, max_concurrency: usize) -> Self {
        Self {
            graph,
            goals: plan.goals,
            states: plan.statuses,
            ready: VecDeque::new(),
            queued: HashSet::new(),
            order: plan.order,
            running: 0,
            max_concurrency: max_concurrency.max(1),
            draining: false,
            errors: BTreeMap::new(),
            blocked_by: BTreeMap::new(),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn status_of(&self, id: &TaskId) -> Option<NodeStatus> {
        self.states.get(id).copied()
    }

    /// Whether every planned node is in a terminal status.
    pub fn is_finished(&self) -> bool {
        self.running == 0 && self.states.values().all(|s| s.is_terminal())
    }

    pub fn deps_satisfied(&self, id: &TaskId) -> bool {
        ReadOnlyStateManager::new(self.graph, &self.states).deps_satisfied(id)
    }

    /// Queue every initially eligible node and dispatch up to the limit
    /// (production API).
    pub fn start(&mut self) -> Vec<ScheduledTask> {
        self.step_start().newly_scheduled
    }

    /// Apply a runner outcome (production API).
    pub fn handle_completion(&mut self, id: &TaskId, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(id, outcome).newly_scheduled
    }

    /// Manual-step variant of [`Scheduler::start`].
    pub fn step_start(&mut self) -> SchedulerStep {
        let eligible: Vec<TaskId> = self
            .order
            .iter()
            .filter(|id| self.states.get(*id) == Some(&NodeStatus::Pending))
            .filter(|id| self.deps_satisfied(id))
            .cloned()
            .collect();

        debug!(
            planned = self.states.len(),
            to_run = self.order.len(),
            eligible = eligible.len(),
            max_concurrency = self.max_concurrency,
            "scheduler: starting"
        );

        for id in eligible {
            self.enqueue(id);
        }

        let newly_scheduled = self.dispatch();
        SchedulerStep {
            newly_scheduled,
            newly_skipped: Vec::new(),
            run_just_finished: self.is_finished(),
        }
    }

    /// Manual-step variant of [`Scheduler::handle_completion`].
    pub fn step_completion(&mut self, id: &TaskId, outcome: TaskOutcome) -> SchedulerStep {
        if self.states.get(id) != Some(&NodeStatus::Running) {
            warn!(task = %id, "completion for task that is not running; ignoring");
            return SchedulerStep::default();
        }
        self.running -= 1;

        let mut newly_skipped = Vec::new();
        let mut manager = StateManager::new(self.graph, &mut self.states);

        match outcome {
            TaskOutcome::Success => {
                manager.set(id, NodeStatus::Succeeded);
                info!(task = %id, in_flight = self.running, "task succeeded");
                if !self.draining {
                    let ready = manager.newly_ready_dependents(id);
                    for dep in ready {
                        self.enqueue(dep);
                    }
                }
            }
            TaskOutcome::Failed(err) => {
                manager.set(id, NodeStatus::Failed);
                newly_skipped = manager.mark_dependents_skipped(id);
                warn!(
                    task = %id,
                    error = %err,
                    skipped = newly_skipped.len(),
                    "task failed; skipping its dependents"
                );
                for skipped in &newly_skipped {
                    self.blocked_by.insert(skipped.clone(), id.clone());
                }
                self.errors.insert(id.clone(), err);
            }
        }

        let newly_scheduled = self.dispatch();
        let run_just_finished = self.is_finished();
        if run_just_finished {
            info!("scheduler: all planned tasks terminal");
        }

        SchedulerStep {
            newly_scheduled,
            newly_skipped,
            run_just_finished,
        }
    }

    /// Stop dispatching: every node not yet running becomes `Cancelled`.
    ///
    /// Running nodes are left to finish. Returns the cancelled nodes.
    pub fn request_shutdown(&mut self) -> Vec<TaskId> {
        self.draining = true;
        self.ready.clear();
        self.queued.clear();

        let mut cancelled = Vec::new();
        for (id, status) in self.states.iter_mut() {
            if *status == NodeStatus::Pending {
                *status = NodeStatus::Cancelled;
                cancelled.push(id.clone());
            }
        }

        info!(
            cancelled = cancelled.len(),
            in_flight = self.running,
            "scheduler: shutdown requested; no further tasks will be dispatched"
        );
        cancelled
    }

    /// Consume the scheduler into the per-node report.
    pub fn into_report(mut self) -> ExecutionReport {
        let nodes = self
            .states
            .into_iter()
            .map(|(id, status)| {
                let report = NodeReport {
                    status,
                    error: self.errors.remove(&id),
                    blocked_by: self.blocked_by.remove(&id),
                };
                (id, report)
            })
            .collect();

        ExecutionReport {
            goals: self.goals,
            nodes,
        }
    }

    fn enqueue(&mut self, id: TaskId) {
        if self.queued.insert(id.clone()) {
            debug!(task = %id, "dependencies satisfied; queued");
            self.ready.push_back(id);
        }
    }

    /// Move queued nodes to `Running` while slots are free.
    fn dispatch(&mut self) -> Vec<ScheduledTask> {
        let mut scheduled = Vec::new();
        if self.draining {
            return scheduled;
        }

        while self.running < self.max_concurrency {
            let Some(id) = self.ready.pop_front() else {
                break;
            };
            self.queued.remove(&id);

            if self.states.get(&id) != Some(&NodeStatus::Pending) {
                continue;
            }
            self.states.insert(id.clone(), NodeStatus::Running);
            self.running += 1;

            info!(
                task = %id,
                in_flight = self.running,
                queued = self.ready.len(),
                "dispatching task"
            );

            let deps = self.graph.dependencies_of(&id).cloned().collect();
            scheduled.push(ScheduledTask { id, deps });
        }

        scheduled
    }
}
