use std::fmt;
use std::str::FromStr;

use crate::dag::TaskKind;
use crate::errors::VxError;

/// A named goal selectable from the CLI.
///
/// Each goal targets every node of one or more task kinds; the scheduler
/// then pulls in whatever those nodes depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Goal {
    StageBaseline,
    StageForecast,
    StageBoth,
    ComputeStats,
    MakePlots,
}

impl Goal {
    pub const ALL: [Goal; 5] = [
        Goal::StageBaseline,
        Goal::StageForecast,
        Goal::StageBoth,
        Goal::ComputeStats,
        Goal::MakePlots,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Goal::StageBaseline => "stage-baseline",
            Goal::StageForecast => "stage-forecast",
            Goal::StageBoth => "stage-both",
            Goal::ComputeStats => "compute-stats",
            Goal::MakePlots => "make-plots",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Goal::StageBaseline => "Baseline grids",
            Goal::StageForecast => "Forecast grids",
            Goal::StageBoth => "Baseline and forecast grids",
            Goal::ComputeStats => "Statistics for forecast vs baseline",
            Goal::MakePlots => "Plots of forecast vs baseline statistics",
        }
    }

    /// Task kinds whose nodes are the goal's terminal nodes.
    pub fn kinds(self) -> &'static [TaskKind] {
        match self {
            Goal::StageBaseline => &[TaskKind::StageBaselineGrid],
            Goal::StageForecast => &[TaskKind::StageForecastGrid],
            Goal::StageBoth => &[TaskKind::StageBaselineGrid, TaskKind::StageForecastGrid],
            Goal::ComputeStats => &[TaskKind::ComputeStats],
            Goal::MakePlots => &[TaskKind::MakePlot],
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Goal {
    type Err = VxError;

    /// Accepts the goal names plus the short aliases `grids_baseline`,
    /// `grids_forecast`, `grids`, `stats` and `plots`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage-baseline" | "grids_baseline" => Ok(Goal::StageBaseline),
            "stage-forecast" | "grids_forecast" => Ok(Goal::StageForecast),
            "stage-both" | "grids" => Ok(Goal::StageBoth),
            "compute-stats" | "stats" => Ok(Goal::ComputeStats),
            "make-plots" | "plots" => Ok(Goal::MakePlots),
            other => {
                let names: Vec<&str> = Goal::ALL.iter().map(|g| g.name()).collect();
                Err(VxError::GraphConstruction(format!(
                    "unknown goal '{other}' (expected one of: {})",
                    names.join(", ")
                )))
            }
        }
    }
}
