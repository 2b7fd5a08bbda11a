// src/dag/mod.rs

//! Task graph representation and scheduling.
//!
//! - [`node`] defines task kinds, node ids and graph nodes.
//! - [`graph`] builds the de-duplicated task DAG from verification points.
//! - [`plan`] computes the goal closure and filters out satisfied nodes.
//! - [`scheduler`] contains the per-invocation state machine that decides
//!   which nodes are ready to run, and when dependents can be dispatched.
//! - [`task_info`] provides node statuses and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages multi-node status transitions.

pub mod graph;
pub mod node;
pub mod plan;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{GraphFlags, TaskGraph};
pub use node::{GridKey, PlotKey, Source, TaskId, TaskKind, TaskNode};
pub use plan::{Plan, SatisfactionCheck};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{NodeStatus, ScheduledTask};
