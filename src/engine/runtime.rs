// src/engine/runtime.rs

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{Plan, ScheduledTask, Scheduler, TaskGraph};
use crate::errors::Result;
use crate::exec::{RunnerError, RunnerErrorKind, RunnerTable, TaskRunner};

use super::core::CoreRuntime;
use super::event_handlers::CoreCommand;
use super::report::ExecutionReport;
use super::{RuntimeEvent, TaskOutcome};

/// Capacity of the runtime event channel.
const EVENT_BUFFER: usize = 64;

/// Drives the scheduler in response to `RuntimeEvent`s, and spawns a runner
/// for every task the core dispatches.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. Each runner runs on its own Tokio task and reports back
/// through the event channel, so status transitions happen only on this loop.
pub struct Runtime<'g> {
    core: CoreRuntime<'g>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    runners: Arc<RunnerTable>,
}

impl fmt::Debug for Runtime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<'g> Runtime<'g> {
    pub fn new(
        graph: &'g TaskGraph,
        plan: Plan,
        runners: Arc<RunnerTable>,
        max_concurrency: usize,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let core = CoreRuntime::new(Scheduler::new(graph, plan, max_concurrency));
        Self {
            core,
            event_rx,
            event_tx,
            runners,
        }
    }

    /// Sender for injecting events, e.g. `ShutdownRequested` on Ctrl-C.
    pub fn event_sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.event_tx.clone()
    }

    /// Main event loop.
    ///
    /// - Dispatches the initially eligible tasks.
    /// - Feeds completions and shutdown requests into the core.
    /// - Spawns runners for the tasks the core dispatches.
    /// - Stops once every planned node is terminal.
    pub async fn run(mut self) -> Result<ExecutionReport> {
        info!(
            max_concurrency = self.core.scheduler().max_concurrency(),
            "runtime started"
        );

        let mut step = self.core.start();

        loop {
            for command in step.commands {
                self.execute_command(command);
            }

            if !step.keep_running {
                break;
            }

            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    // Unreachable while `self` holds a sender.
                    warn!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            step = self.core.step(event);
        }

        info!("runtime exiting");
        Ok(self.core.into_report())
    }

    fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks),
        }
    }

    fn spawn_ready(&self, tasks: Vec<ScheduledTask>) {
        for task in tasks {
            let runner = self.runners.runner_for(task.id.kind()).cloned();
            let tx = self.event_tx.clone();

            tokio::spawn(async move {
                let id = task.id.clone();
                let outcome = run_isolated(runner, task).await;
                if tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: id.clone(),
                        outcome,
                    })
                    .await
                    .is_err()
                {
                    debug!(task = %id, "runtime gone; dropping completion");
                }
            });
        }
    }
}

/// Run one task on its own Tokio task so a panic becomes a failure of that
/// node only.
async fn run_isolated(runner: Option<Arc<dyn TaskRunner>>, task: ScheduledTask) -> TaskOutcome {
    let id = task.id.clone();
    let Some(runner) = runner else {
        return TaskOutcome::Failed(RunnerError::new(
            id.clone(),
            RunnerErrorKind::Unavailable,
            format!("no runner configured for {}", id.kind()),
        ));
    };

    match tokio::spawn(runner.execute(task)).await {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(err)) => TaskOutcome::Failed(err),
        Err(join) if join.is_panic() => TaskOutcome::Failed(RunnerError::new(
            id,
            RunnerErrorKind::Panicked,
            panic_message(join.into_panic()),
        )),
        Err(_) => TaskOutcome::Failed(RunnerError::new(
            id,
            RunnerErrorKind::Cancelled,
            "runner task was cancelled",
        )),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "runner panicked".to_string()
    }
}
