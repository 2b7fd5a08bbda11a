// src/dag/node.rs

//! Task kinds, node identifiers and graph nodes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};

use crate::params::point::variable_label;
use crate::params::time::{format_cycle, leadtime_hours};
use crate::params::{Level, VerificationPoint};

/// The four stages of the workflow.
///
/// The grid stages are independent leaves; `ComputeStats` needs both grids
/// of its point; `MakePlot` needs the stats it displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    StageBaselineGrid,
    StageForecastGrid,
    ComputeStats,
    MakePlot,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::StageBaselineGrid,
        TaskKind::StageForecastGrid,
        TaskKind::ComputeStats,
        TaskKind::MakePlot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::StageBaselineGrid => "stage-baseline-grid",
            TaskKind::StageForecastGrid => "stage-forecast-grid",
            TaskKind::ComputeStats => "compute-stats",
            TaskKind::MakePlot => "make-plot",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a staged grid: one per (cycle, leadtime), shared by every
/// variable and level of that time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridKey {
    pub cycle: NaiveDateTime,
    pub leadtime: TimeDelta,
}

impl GridKey {
    pub fn of(point: &VerificationPoint) -> Self {
        Self {
            cycle: point.cycle,
            leadtime: point.leadtime,
        }
    }

    /// The zero-leadtime grid valid at the same time as `point`.
    pub fn analysis_of(point: &VerificationPoint) -> Self {
        Self {
            cycle: point.valid_time(),
            leadtime: TimeDelta::zero(),
        }
    }
}

/// Which dataset's forecast a statistics node verifies.
///
/// Forecast statistics compare the forecast grid with the baseline grid of the
/// same point; baseline statistics compare the baseline's grid for the point
/// with the baseline analysis at the valid time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Forecast,
    Baseline,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Forecast => "forecast",
            Source::Baseline => "baseline",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a plot: one per (cycle, variable, level), spanning all leadtimes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlotKey {
    pub cycle: NaiveDateTime,
    pub variable: String,
    pub level: Option<Level>,
}

impl PlotKey {
    pub fn of(point: &VerificationPoint) -> Self {
        Self {
            cycle: point.cycle,
            variable: point.variable.clone(),
            level: point.level,
        }
    }
}

/// Node identifier, keyed by the minimal tuple identifying the artifact.
///
/// Two verification points that need the same artifact produce equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    BaselineGrid(GridKey),
    ForecastGrid(GridKey),
    Stats(Source, VerificationPoint),
    Plot(PlotKey),
}

impl TaskId {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskId::BaselineGrid(_) => TaskKind::StageBaselineGrid,
            TaskId::ForecastGrid(_) => TaskKind::StageForecastGrid,
            TaskId::Stats(..) => TaskKind::ComputeStats,
            TaskId::Plot(_) => TaskKind::MakePlot,
        }
    }

    pub fn cycle(&self) -> NaiveDateTime {
        match self {
            TaskId::BaselineGrid(g) | TaskId::ForecastGrid(g) => g.cycle,
            TaskId::Stats(_, p) => p.cycle,
            TaskId::Plot(k) => k.cycle,
        }
    }

    /// `None` for plots, which span every leadtime of their cycle.
    pub fn leadtime(&self) -> Option<TimeDelta> {
        match self {
            TaskId::BaselineGrid(g) | TaskId::ForecastGrid(g) => Some(g.leadtime),
            TaskId::Stats(_, p) => Some(p.leadtime),
            TaskId::Plot(_) => None,
        }
    }

    /// `None` for grids, which are shared across variables.
    pub fn variable(&self) -> Option<&str> {
        match self {
            TaskId::BaselineGrid(_) | TaskId::ForecastGrid(_) => None,
            TaskId::Stats(_, p) => Some(p.variable.as_str()),
            TaskId::Plot(k) => Some(k.variable.as_str()),
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self {
            TaskId::BaselineGrid(_) | TaskId::ForecastGrid(_) => None,
            TaskId::Stats(_, p) => p.level,
            TaskId::Plot(k) => k.level,
        }
    }

    /// Dataset verified by a statistics node.
    pub fn source(&self) -> Option<Source> {
        match self {
            TaskId::Stats(source, _) => Some(*source),
            _ => None,
        }
    }

    /// Variable label used in artifact file names (`HGT-0900`).
    pub fn variable_label(&self) -> Option<String> {
        self.variable()
            .map(|variable| variable_label(variable, self.level()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::BaselineGrid(g) | TaskId::ForecastGrid(g) => write!(
                f,
                "{}[{} +{}h]",
                self.kind(),
                format_cycle(&g.cycle),
                leadtime_hours(&g.leadtime)
            ),
            TaskId::Stats(Source::Forecast, p) => write!(f, "{}[{}]", self.kind(), p),
            TaskId::Stats(Source::Baseline, p) => write!(f, "{}[baseline {}]", self.kind(), p),
            TaskId::Plot(k) => {
                let label = match k.level {
                    Some(level) => format!("{}@{}", k.variable, level),
                    None => k.variable.clone(),
                };
                write!(f, "{}[{} {}]", self.kind(), format_cycle(&k.cycle), label)
            }
        }
    }
}

/// A node of the task graph: its id plus adjacency.
///
/// Adjacency is fixed once the graph is built; run status is tracked by the
/// scheduler, never on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: TaskId,
    /// Nodes that must be satisfied before this one may run.
    pub deps: BTreeSet<TaskId>,
    /// Nodes that list this one in their `deps`.
    pub dependents: BTreeSet<TaskId>,
}

impl TaskNode {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            deps: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.id.kind()
    }
}
