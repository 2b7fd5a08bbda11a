// src/engine/mod.rs

//! Orchestration engine for vxflow.
//!
//! This module ties together:
//! - planning (goal closure + satisfied filtering)
//! - the scheduler
//! - the main runtime event loop that reacts to:
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::info;

use crate::dag::{Plan, SatisfactionCheck, TaskGraph, TaskId};
use crate::errors::Result;
use crate::exec::{RunnerError, RunnerTable};

pub mod core;
pub mod event_handlers;
pub mod report;
pub mod runtime;

pub use self::core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use report::{ExecutionReport, NodeReport};
pub use runtime::Runtime;

/// Outcome of a runner for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(RunnerError),
}

/// Events flowing into the runtime from runners and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A runner finished with a concrete outcome.
    TaskCompleted { task: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Effective concurrency limit: `None` or `0` means every available
/// processing unit.
pub fn resolve_concurrency(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1),
    }
}

/// Compute the closure and satisfied set for `goals` without running anything.
pub fn dry_check(
    graph: &TaskGraph,
    goals: &[TaskId],
    oracle: &dyn SatisfactionCheck,
) -> Result<Plan> {
    Plan::compute(graph, goals, oracle)
}

/// Plan and run `goals` to completion.
///
/// Fails only for graph errors; runner failures are reported per node.
pub async fn execute(
    graph: &TaskGraph,
    goals: &[TaskId],
    oracle: &dyn SatisfactionCheck,
    runners: Arc<RunnerTable>,
    max_concurrency: usize,
) -> Result<ExecutionReport> {
    let plan = Plan::compute(graph, goals, oracle)?;
    if plan.is_complete() {
        info!(satisfied = plan.len(), "nothing to do; all outputs present");
    }
    Runtime::new(graph, plan, runners, max_concurrency).run().await
}
