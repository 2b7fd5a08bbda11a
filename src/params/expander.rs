// src/params/expander.rs

//! Expansion of configured ranges/lists into verification points.

use std::collections::HashSet;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use tracing::{debug, warn};

use crate::config::model::{ConfigFile, TimeSpec, VariableConfig};
use crate::errors::{Result, VxError};
use crate::params::point::{Level, LevelType, VerificationPoint};
use crate::params::time::{format_cycle, parse_cycle, parse_duration};

/// One variable with its concrete level list.
///
/// `levels` is `[None]` for level types without levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAxis {
    pub key: String,
    pub level_type: LevelType,
    pub levels: Vec<Option<Level>>,
}

/// The parsed, validated axes of the parameter space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpace {
    pub cycles: Vec<NaiveDateTime>,
    pub leadtimes: Vec<TimeDelta>,
    pub variables: Vec<VariableAxis>,
}

impl ParameterSpace {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let cycles = expand_cycles(&cfg.cycles)?;
        let leadtimes = expand_leadtimes(&cfg.leadtimes)?;
        require_whole_hours(&cycles, &leadtimes)?;

        let mut variables = Vec::with_capacity(cfg.variables.len());
        for (key, var) in cfg.variables.iter() {
            variables.push(variable_axis(key, var)?);
        }

        Ok(Self {
            cycles,
            leadtimes,
            variables,
        })
    }

    /// The ordered cross-product: cycle, then leadtime, then variable (by key),
    /// then level (declaration order).
    pub fn points(&self) -> Vec<VerificationPoint> {
        let mut points = Vec::with_capacity(self.len());

        for cycle in &self.cycles {
            for leadtime in &self.leadtimes {
                for var in &self.variables {
                    for level in &var.levels {
                        points.push(VerificationPoint {
                            cycle: *cycle,
                            leadtime: *leadtime,
                            variable: var.key.clone(),
                            level: *level,
                        });
                    }
                }
            }
        }

        points
    }

    pub fn len(&self) -> usize {
        let per_time: usize = self.variables.iter().map(|v| v.levels.len()).sum();
        self.cycles.len() * self.leadtimes.len() * per_time
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expand a validated configuration into its verification points.
pub fn expand_points(cfg: &ConfigFile) -> Result<Vec<VerificationPoint>> {
    let space = ParameterSpace::from_config(cfg)?;
    let points = space.points();
    debug!(
        cycles = space.cycles.len(),
        leadtimes = space.leadtimes.len(),
        variables = space.variables.len(),
        points = points.len(),
        "expanded parameter space"
    );
    Ok(points)
}

enum RangeFault {
    NonPositiveStep,
    StopBeforeStart,
}

/// Inclusive range expansion; `add` returns `None` on overflow, which ends
/// the range.
fn expand_range<T, F>(
    start: T,
    step: TimeDelta,
    stop: T,
    add: F,
) -> std::result::Result<Vec<T>, RangeFault>
where
    T: Copy + PartialOrd,
    F: Fn(T, TimeDelta) -> Option<T>,
{
    if step <= TimeDelta::zero() {
        return Err(RangeFault::NonPositiveStep);
    }
    if stop < start {
        return Err(RangeFault::StopBeforeStart);
    }

    let mut values = vec![start];
    let mut current = start;
    while let Some(next) = add(current, step) {
        if next > stop {
            break;
        }
        values.push(next);
        current = next;
    }
    Ok(values)
}

fn range_error(axis: &str, fault: RangeFault, start: &str, step: &str, stop: &str) -> VxError {
    let reason = match fault {
        RangeFault::NonPositiveStep => format!("step '{step}' must be positive"),
        RangeFault::StopBeforeStart => format!("stop '{stop}' precedes start '{start}'"),
    };
    VxError::ConfigRange(format!("{axis}: {reason}"))
}

fn expand_cycles(spec: &TimeSpec) -> Result<Vec<NaiveDateTime>> {
    match spec {
        TimeSpec::Range { start, step, stop } => {
            let (s, d, e) = (parse_cycle(start)?, parse_duration(step)?, parse_cycle(stop)?);
            expand_range(s, d, e, |t, d| t.checked_add_signed(d))
                .map_err(|fault| range_error("cycles", fault, start, step, stop))
        }
        TimeSpec::List { list } => {
            let parsed = list
                .iter()
                .map(|s| parse_cycle(s))
                .collect::<Result<Vec<_>>>()?;
            dedup_list("cycles", parsed)
        }
    }
}

fn expand_leadtimes(spec: &TimeSpec) -> Result<Vec<TimeDelta>> {
    match spec {
        TimeSpec::Range { start, step, stop } => {
            let (s, d, e) = (
                parse_duration(start)?,
                parse_duration(step)?,
                parse_duration(stop)?,
            );
            expand_range(s, d, e, |t, d| t.checked_add(&d))
                .map_err(|fault| range_error("leadtimes", fault, start, step, stop))
        }
        TimeSpec::List { list } => {
            let parsed = list
                .iter()
                .map(|s| parse_duration(s))
                .collect::<Result<Vec<_>>>()?;
            dedup_list("leadtimes", parsed)
        }
    }
}

/// Artifact paths and task ids resolve time to the hour, so every cycle and
/// leadtime must fall on one.
fn require_whole_hours(cycles: &[NaiveDateTime], leadtimes: &[TimeDelta]) -> Result<()> {
    if let Some(cycle) = cycles
        .iter()
        .find(|c| c.minute() != 0 || c.second() != 0 || c.nanosecond() != 0)
    {
        return Err(VxError::ConfigRange(format!(
            "cycles: {} is not on a whole hour",
            format_cycle(cycle)
        )));
    }
    if let Some(leadtime) = leadtimes
        .iter()
        .find(|lt| lt.num_seconds() % 3600 != 0 || lt.subsec_nanos() != 0)
    {
        return Err(VxError::ConfigRange(format!(
            "leadtimes: {}s is not a whole number of hours",
            leadtime.num_seconds()
        )));
    }
    Ok(())
}

/// Keep the first occurrence of each value, preserving declaration order.
fn dedup_list<T>(axis: &str, values: Vec<T>) -> Result<Vec<T>>
where
    T: Copy + Eq + std::hash::Hash,
{
    if values.is_empty() {
        return Err(VxError::ConfigRange(format!("{axis}: list is empty")));
    }

    let mut seen = HashSet::new();
    let total = values.len();
    let unique: Vec<T> = values.into_iter().filter(|v| seen.insert(*v)).collect();
    if unique.len() != total {
        warn!(axis, dropped = total - unique.len(), "duplicate entries ignored");
    }
    Ok(unique)
}

fn variable_axis(key: &str, var: &VariableConfig) -> Result<VariableAxis> {
    let fail = |reason: String| VxError::ConfigVariable {
        variable: key.to_string(),
        reason,
    };

    let declared = var.levels.as_deref().unwrap_or(&[]);

    let levels = if var.level_type.requires_levels() {
        if declared.is_empty() {
            return Err(fail(format!(
                "level type {} requires levels",
                var.level_type
            )));
        }

        let mut levels = Vec::with_capacity(declared.len());
        for value in declared {
            let level = Level::new(*value)
                .ok_or_else(|| fail(format!("level {value} is not a finite number")))?;
            if levels.contains(&Some(level)) {
                return Err(fail(format!("level {level} is declared twice")));
            }
            levels.push(Some(level));
        }
        levels
    } else {
        if !declared.is_empty() {
            return Err(fail(format!(
                "level type {} does not accept levels",
                var.level_type
            )));
        }
        vec![None]
    };

    Ok(VariableAxis {
        key: key.to_string(),
        level_type: var.level_type,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, step: &str, stop: &str) -> TimeSpec {
        TimeSpec::Range {
            start: start.into(),
            step: step.into(),
            stop: stop.into(),
        }
    }

    #[test]
    fn cycle_range_is_inclusive_of_stop() {
        let spec = range("2024-12-19T18:00:00", "12:00:00", "2024-12-20T06:00:00");
        let cycles = expand_cycles(&spec).unwrap();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1], parse_cycle("2024-12-20T06:00:00").unwrap());
    }

    #[test]
    fn range_stops_before_overshooting() {
        let leadtimes = expand_leadtimes(&range("0", "5", "12")).unwrap();
        assert_eq!(
            leadtimes,
            vec![TimeDelta::hours(0), TimeDelta::hours(5), TimeDelta::hours(10)]
        );
    }

    #[test]
    fn reversed_range_is_a_range_error() {
        let err = expand_leadtimes(&range("12", "6", "0")).unwrap_err();
        assert!(matches!(err, VxError::ConfigRange(ref m) if m.contains("precedes")));
    }

    #[test]
    fn zero_step_is_a_range_error() {
        let err = expand_cycles(&range("2024-12-19T18:00:00", "0", "2024-12-19T18:00:00"))
            .unwrap_err();
        assert!(matches!(err, VxError::ConfigRange(ref m) if m.contains("positive")));
    }

    #[test]
    fn empty_list_is_a_range_error() {
        let err = expand_leadtimes(&TimeSpec::List { list: vec![] }).unwrap_err();
        assert!(matches!(err, VxError::ConfigRange(_)));
    }

    #[test]
    fn list_duplicates_are_dropped_in_order() {
        let lts = expand_leadtimes(&TimeSpec::List {
            list: vec!["6".into(), "0".into(), "6".into()],
        })
        .unwrap();
        assert_eq!(lts, vec![TimeDelta::hours(6), TimeDelta::hours(0)]);
    }

    #[test]
    fn sub_hour_times_are_rejected() {
        let cycles =
            expand_cycles(&range("2024-12-19T18:00:00", "0:30", "2024-12-19T19:00:00")).unwrap();
        let err = require_whole_hours(&cycles, &[TimeDelta::zero()]).unwrap_err();
        assert!(matches!(err, VxError::ConfigRange(ref m) if m.contains("18:30:00")));

        let leadtimes = expand_leadtimes(&range("0", "1:30", "3")).unwrap();
        let err = require_whole_hours(&cycles[..1], &leadtimes).unwrap_err();
        assert!(matches!(err, VxError::ConfigRange(ref m) if m.contains("5400s")));

        let leadtimes = expand_leadtimes(&range("0", "3:00:00", "6")).unwrap();
        assert!(require_whole_hours(&cycles[..1], &leadtimes).is_ok());
    }

    #[test]
    fn negative_zero_level_duplicates_zero() {
        let var = VariableConfig {
            name: "t".into(),
            level_type: LevelType::HeightAboveGround,
            levels: Some(vec![0.0, -0.0]),
        };
        assert!(matches!(
            variable_axis("T", &var),
            Err(VxError::ConfigVariable { ref reason, .. }) if reason.contains("twice")
        ));
    }

    #[test]
    fn level_rules_follow_level_type() {
        let needs = VariableConfig {
            name: "gh".into(),
            level_type: LevelType::IsobaricInhPa,
            levels: None,
        };
        assert!(matches!(
            variable_axis("HGT", &needs),
            Err(VxError::ConfigVariable { .. })
        ));

        let forbids = VariableConfig {
            name: "refc".into(),
            level_type: LevelType::Atmosphere,
            levels: Some(vec![1000.0]),
        };
        assert!(matches!(
            variable_axis("REFC", &forbids),
            Err(VxError::ConfigVariable { .. })
        ));

        let dup = VariableConfig {
            name: "q".into(),
            level_type: LevelType::IsobaricInhPa,
            levels: Some(vec![900.0, 900.0]),
        };
        assert!(variable_axis("SPFH", &dup).is_err());

        let ok = VariableConfig {
            name: "refc".into(),
            level_type: LevelType::Atmosphere,
            levels: Some(vec![]),
        };
        assert_eq!(variable_axis("REFC", &ok).unwrap().levels, vec![None]);
    }
}
