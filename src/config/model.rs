// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::dag::TaskKind;
use crate::params::LevelType;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// threads = 4
///
/// [baseline]
/// name = "GFS"
///
/// [forecast]
/// name = "MPAS"
///
/// [cycles]
/// start = "2024-12-19T18:00:00"
/// step = "12:00:00"
/// stop = "2024-12-20T06:00:00"
///
/// [leadtimes]
/// list = ["00:00:00", "06:00:00"]
///
/// [paths]
/// grids_baseline = "grids/baseline"
/// grids_forecast = "grids/forecast"
/// run = "run"
///
/// [variables.HGT]
/// name = "gh"
/// level_type = "isobaricInhPa"
/// levels = [900]
///
/// [runners]
/// stage_baseline = "fetch {yyyymmdd} {hh} {leadtime} {output}"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    pub baseline: BaselineSection,

    pub forecast: ForecastSection,

    pub cycles: TimeSpec,

    pub leadtimes: TimeSpec,

    pub paths: PathsSection,

    /// Keys are the variable identifiers used throughout the graph (e.g. `HGT`).
    #[serde(default)]
    pub variables: BTreeMap<String, VariableConfig>,

    #[serde(default)]
    pub runners: RunnersSection,
}

/// Validated configuration. Only obtainable via `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub baseline: BaselineSection,
    pub forecast: ForecastSection,
    pub cycles: TimeSpec,
    pub leadtimes: TimeSpec,
    pub paths: PathsSection,
    pub variables: BTreeMap<String, VariableConfig>,
    pub runners: RunnersSection,
}

impl ConfigFile {
    /// Wrap an already-validated raw config.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            baseline: raw.baseline,
            forecast: raw.forecast,
            cycles: raw.cycles,
            leadtimes: raw.leadtimes,
            paths: raw.paths,
            variables: raw.variables,
            runners: raw.runners,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of concurrently running tasks.
    ///
    /// `None` or `0` means "use all available processing units".
    #[serde(default)]
    pub threads: Option<usize>,
}

/// `[baseline]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineSection {
    pub name: String,

    /// When true, plots also depend directly on the baseline grids they display.
    #[serde(default)]
    pub plot: bool,

    /// When true, the baseline's own forecasts are verified against its
    /// analyses too, and plots include those statistics.
    #[serde(default)]
    pub compare: bool,
}

/// `[forecast]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSection {
    pub name: String,
}

/// A time axis, either an inclusive `start`/`step`/`stop` range or an
/// explicit `list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TimeSpec {
    Range {
        start: String,
        step: String,
        stop: String,
    },
    List {
        list: Vec<String>,
    },
}

/// `[paths]` section: roots under which artifacts are written.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub grids_baseline: PathBuf,
    pub grids_forecast: PathBuf,
    pub run: PathBuf,
}

/// `[variables.<key>]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariableConfig {
    /// Canonical short name of the variable (e.g. `gh`, `2t`, `refc`).
    pub name: String,

    pub level_type: LevelType,

    #[serde(default)]
    pub levels: Option<Vec<f64>>,
}

/// `[runners]` section: shell command templates per task kind.
///
/// A missing template means that kind has no runner; nodes of that kind
/// fail when they need to run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnersSection {
    #[serde(default)]
    pub stage_baseline: Option<String>,

    #[serde(default)]
    pub stage_forecast: Option<String>,

    #[serde(default)]
    pub compute_stats: Option<String>,

    #[serde(default)]
    pub make_plot: Option<String>,
}

impl RunnersSection {
    /// Key of the template for `kind` under `[runners]`.
    pub fn key_for(kind: TaskKind) -> &'static str {
        match kind {
            TaskKind::StageBaselineGrid => "stage_baseline",
            TaskKind::StageForecastGrid => "stage_forecast",
            TaskKind::ComputeStats => "compute_stats",
            TaskKind::MakePlot => "make_plot",
        }
    }

    pub fn template_for(&self, kind: TaskKind) -> Option<&str> {
        let template = match kind {
            TaskKind::StageBaselineGrid => &self.stage_baseline,
            TaskKind::StageForecastGrid => &self.stage_forecast,
            TaskKind::ComputeStats => &self.compute_stats,
            TaskKind::MakePlot => &self.make_plot,
        };
        template.as_deref()
    }
}
