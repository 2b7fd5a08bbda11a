// src/oracle/layout.rs

use std::path::{Path, PathBuf};

use crate::config::model::ConfigFile;
use crate::dag::{Source, TaskId};
use crate::params::time::{hh, leadtime_hours, yyyymmdd};

/// Deterministic, task-derived artifact paths.
///
/// ```text
/// {grids_baseline}/{yyyymmdd}/{hh}/{leadtime}/baseline.grib2
/// {grids_forecast}/{yyyymmdd}/{hh}/{leadtime}/forecast.nc
/// {run}/stats/{yyyymmdd}/{hh}/{leadtime}/{label}.stat
/// {run}/stats-baseline/{yyyymmdd}/{hh}/{leadtime}/{label}.stat
/// {run}/plots/{yyyymmdd}/{hh}/{label}-plot.png
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub grids_baseline: PathBuf,
    pub grids_forecast: PathBuf,
    pub run: PathBuf,
}

impl ArtifactLayout {
    pub fn new(
        grids_baseline: impl Into<PathBuf>,
        grids_forecast: impl Into<PathBuf>,
        run: impl Into<PathBuf>,
    ) -> Self {
        Self {
            grids_baseline: grids_baseline.into(),
            grids_forecast: grids_forecast.into(),
            run: run.into(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            &cfg.paths.grids_baseline,
            &cfg.paths.grids_forecast,
            &cfg.paths.run,
        )
    }

    /// The artifact whose presence marks `id` as done.
    pub fn path_for(&self, id: &TaskId) -> PathBuf {
        let cycle = id.cycle();
        let time_dir = |root: &Path| root.join(yyyymmdd(&cycle)).join(hh(&cycle));
        let label = id.variable_label().unwrap_or_default();

        match id {
            TaskId::BaselineGrid(g) => time_dir(&self.grids_baseline)
                .join(leadtime_hours(&g.leadtime))
                .join("baseline.grib2"),
            TaskId::ForecastGrid(g) => time_dir(&self.grids_forecast)
                .join(leadtime_hours(&g.leadtime))
                .join("forecast.nc"),
            TaskId::Stats(source, p) => {
                let dir = match source {
                    Source::Forecast => "stats",
                    Source::Baseline => "stats-baseline",
                };
                time_dir(&self.run.join(dir))
                    .join(leadtime_hours(&p.leadtime))
                    .join(format!("{label}.stat"))
            }
            TaskId::Plot(_) => time_dir(&self.run.join("plots")).join(format!("{label}-plot.png")),
        }
    }
}
