// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for reading
//! events from the channel and spawning runners. The core is unit tested
//! without any Tokio, channels, filesystem, or processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    handle_shutdown, handle_start, handle_task_completion, CoreStep,
};
use crate::engine::report::ExecutionReport;
use crate::engine::RuntimeEvent;

/// Pure core runtime state.
///
/// Owns the scheduler and is the only place node statuses change. It has
/// **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime<'g> {
    scheduler: Scheduler<'g>,
}

impl<'g> CoreRuntime<'g> {
    pub fn new(scheduler: Scheduler<'g>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler<'g> {
        &self.scheduler
    }

    /// Dispatch the initially eligible nodes.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.scheduler, task, outcome)
            }
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.scheduler),
        }
    }

    pub fn into_report(self) -> ExecutionReport {
        self.scheduler.into_report()
    }
}
