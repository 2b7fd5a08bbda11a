#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use vxflow::config::{
    BaselineSection, ConfigFile, ConfigSection, ForecastSection, PathsSection, RawConfigFile,
    RunnersSection, TimeSpec, VariableConfig,
};
use vxflow::dag::TaskKind;
use vxflow::params::LevelType;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Defaults: one cycle (`2024-12-19T18:00:00`), one leadtime (`0`), no
/// variables (add one before `build()`), artifact roots under `/data`, no
/// runners.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                baseline: BaselineSection {
                    name: "GFS".to_string(),
                    plot: false,
                    compare: false,
                },
                forecast: ForecastSection {
                    name: "MPAS".to_string(),
                },
                cycles: list(&["2024-12-19T18:00:00"]),
                leadtimes: list(&["0"]),
                paths: paths_under(Path::new("/data")),
                variables: BTreeMap::new(),
                runners: RunnersSection::default(),
            },
        }
    }

    pub fn cycles(mut self, values: &[&str]) -> Self {
        self.config.cycles = list(values);
        self
    }

    pub fn cycle_range(mut self, start: &str, step: &str, stop: &str) -> Self {
        self.config.cycles = range(start, step, stop);
        self
    }

    pub fn leadtimes(mut self, values: &[&str]) -> Self {
        self.config.leadtimes = list(values);
        self
    }

    pub fn leadtime_range(mut self, start: &str, step: &str, stop: &str) -> Self {
        self.config.leadtimes = range(start, step, stop);
        self
    }

    /// A variable without levels (`atmosphere`).
    pub fn variable(self, key: &str, name: &str) -> Self {
        self.variable_with(key, VariableBuilder::new(name, LevelType::Atmosphere))
    }

    /// An `isobaricInhPa` variable at the given levels.
    pub fn isobaric(self, key: &str, name: &str, levels: &[f64]) -> Self {
        self.variable_with(
            key,
            VariableBuilder::new(name, LevelType::IsobaricInhPa).levels(levels),
        )
    }

    pub fn variable_with(mut self, key: &str, var: VariableBuilder) -> Self {
        self.config.variables.insert(key.to_string(), var.build());
        self
    }

    pub fn baseline_plot(mut self, val: bool) -> Self {
        self.config.baseline.plot = val;
        self
    }

    pub fn baseline_compare(mut self, val: bool) -> Self {
        self.config.baseline.compare = val;
        self
    }

    pub fn threads(mut self, n: usize) -> Self {
        self.config.config.threads = Some(n);
        self
    }

    /// Put all artifact roots under `root`.
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.config.paths = paths_under(root.as_ref());
        self
    }

    pub fn runner(mut self, kind: TaskKind, template: &str) -> Self {
        let slot = match kind {
            TaskKind::StageBaselineGrid => &mut self.config.runners.stage_baseline,
            TaskKind::StageForecastGrid => &mut self.config.runners.stage_forecast,
            TaskKind::ComputeStats => &mut self.config.runners.compute_stats,
            TaskKind::MakePlot => &mut self.config.runners.make_plot,
        };
        *slot = Some(template.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `VariableConfig`.
pub struct VariableBuilder {
    var: VariableConfig,
}

impl VariableBuilder {
    pub fn new(name: &str, level_type: LevelType) -> Self {
        Self {
            var: VariableConfig {
                name: name.to_string(),
                level_type,
                levels: None,
            },
        }
    }

    pub fn levels(mut self, levels: &[f64]) -> Self {
        self.var.levels = Some(levels.to_vec());
        self
    }

    pub fn build(self) -> VariableConfig {
        self.var
    }
}

fn list(values: &[&str]) -> TimeSpec {
    TimeSpec::List {
        list: values.iter().map(|s| s.to_string()).collect(),
    }
}

fn range(start: &str, step: &str, stop: &str) -> TimeSpec {
    TimeSpec::Range {
        start: start.to_string(),
        step: step.to_string(),
        stop: stop.to_string(),
    }
}

fn paths_under(root: &Path) -> PathsSection {
    PathsSection {
        grids_baseline: root.join("grids").join("baseline"),
        grids_forecast: root.join("grids").join("forecast"),
        run: PathBuf::from(root).join("run"),
    }
}
