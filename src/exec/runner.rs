// src/exec/runner.rs

//! Runner trait, error classification and the kind → runner table.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::config::model::ConfigFile;
use crate::dag::{ScheduledTask, TaskId, TaskKind};
use crate::errors::Result;
use crate::exec::command::{CommandRunner, RunContext};
use crate::exec::template::CommandTemplate;
use crate::fs::FileSystem;

/// Future returned by [`TaskRunner::execute`].
///
/// It owns everything it needs so the runtime can spawn it on its own task.
pub type RunnerFuture = Pin<Box<dyn Future<Output = std::result::Result<(), RunnerError>> + Send>>;

/// A unit of work for one task kind.
///
/// Implementations must be safe to invoke concurrently, including with
/// themselves. They report success or a classified [`RunnerError`] and never
/// touch node statuses.
pub trait TaskRunner: Send + Sync + fmt::Debug {
    fn execute(&self, task: ScheduledTask) -> RunnerFuture;
}

/// Classification of a runner failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerErrorKind {
    /// The external command could not be started.
    Spawn,
    /// The command ran and exited unsuccessfully.
    Exit(i32),
    /// The command succeeded but its output could not be published.
    Publish,
    /// The runner panicked.
    Panicked,
    /// The runner was stopped before reporting.
    Cancelled,
    /// No runner is configured for the node's kind.
    Unavailable,
}

impl fmt::Display for RunnerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerErrorKind::Spawn => f.write_str("spawn failed"),
            RunnerErrorKind::Exit(code) => write!(f, "exited with status {code}"),
            RunnerErrorKind::Publish => f.write_str("publish failed"),
            RunnerErrorKind::Panicked => f.write_str("panicked"),
            RunnerErrorKind::Cancelled => f.write_str("cancelled"),
            RunnerErrorKind::Unavailable => f.write_str("no runner"),
        }
    }
}

/// A failed node, with the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{task}: {kind}: {message}")]
pub struct RunnerError {
    pub task: TaskId,
    pub kind: RunnerErrorKind,
    pub message: String,
}

impl RunnerError {
    pub fn new(task: TaskId, kind: RunnerErrorKind, message: impl Into<String>) -> Self {
        Self {
            task,
            kind,
            message: message.into(),
        }
    }
}

/// Fixed mapping from [`TaskKind`] to its runner.
#[derive(Debug, Clone, Default)]
pub struct RunnerTable {
    stage_baseline: Option<Arc<dyn TaskRunner>>,
    stage_forecast: Option<Arc<dyn TaskRunner>>,
    compute_stats: Option<Arc<dyn TaskRunner>>,
    make_plot: Option<Arc<dyn TaskRunner>>,
}

impl RunnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same runner for every kind.
    pub fn uniform(runner: Arc<dyn TaskRunner>) -> Self {
        let mut table = Self::new();
        for kind in TaskKind::ALL {
            table.set(kind, runner.clone());
        }
        table
    }

    pub fn with(mut self, kind: TaskKind, runner: Arc<dyn TaskRunner>) -> Self {
        self.set(kind, runner);
        self
    }

    pub fn set(&mut self, kind: TaskKind, runner: Arc<dyn TaskRunner>) {
        *self.slot_mut(kind) = Some(runner);
    }

    pub fn runner_for(&self, kind: TaskKind) -> Option<&Arc<dyn TaskRunner>> {
        match kind {
            TaskKind::StageBaselineGrid => self.stage_baseline.as_ref(),
            TaskKind::StageForecastGrid => self.stage_forecast.as_ref(),
            TaskKind::ComputeStats => self.compute_stats.as_ref(),
            TaskKind::MakePlot => self.make_plot.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: TaskKind) -> &mut Option<Arc<dyn TaskRunner>> {
        match kind {
            TaskKind::StageBaselineGrid => &mut self.stage_baseline,
            TaskKind::StageForecastGrid => &mut self.stage_forecast,
            TaskKind::ComputeStats => &mut self.compute_stats,
            TaskKind::MakePlot => &mut self.make_plot,
        }
    }

    /// Kinds without a runner.
    pub fn missing(&self) -> Vec<TaskKind> {
        TaskKind::ALL
            .into_iter()
            .filter(|kind| self.runner_for(*kind).is_none())
            .collect()
    }

    /// One [`CommandRunner`] per configured `[runners]` template.
    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let ctx = Arc::new(RunContext::from_config(cfg));
        let mut table = Self::new();

        for kind in TaskKind::ALL {
            if let Some(raw) = cfg.runners.template_for(kind) {
                let template = CommandTemplate::parse(kind, raw)?;
                let runner = CommandRunner::new(template, ctx.clone(), fs.clone());
                table.set(kind, Arc::new(runner));
            }
        }

        Ok(table)
    }
}
