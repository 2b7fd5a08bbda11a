// src/params/point.rs

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::params::time::{format_cycle, leadtime_hours};

/// Vertical level type of a variable.
///
/// `heightAboveGround` and `isobaricInhPa` need explicit levels;
/// `atmosphere` and `surface` describe a single implicit level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelType {
    Atmosphere,
    HeightAboveGround,
    IsobaricInhPa,
    Surface,
}

impl LevelType {
    pub fn requires_levels(self) -> bool {
        matches!(self, LevelType::HeightAboveGround | LevelType::IsobaricInhPa)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LevelType::Atmosphere => "atmosphere",
            LevelType::HeightAboveGround => "heightAboveGround",
            LevelType::IsobaricInhPa => "isobaricInhPa",
            LevelType::Surface => "surface",
        }
    }
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric vertical level (e.g. `900` hPa, `2` m).
///
/// Equality, hashing and ordering use the bit pattern / total order of the
/// underlying float so levels can key maps. `-0.0` is stored as `0.0`, so
/// equal levels print equally. Non-finite values are rejected.
#[derive(Debug, Clone, Copy)]
pub struct Level(f64);

impl Level {
    pub fn new(value: f64) -> Option<Self> {
        let value = if value == 0.0 { 0.0 } else { value };
        value.is_finite().then_some(Level(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Level {}

impl Hash for Level {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Level {
    /// Whole levels are zero-padded to four digits (`0900`), others printed as-is.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{:04}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One point of the cycle × leadtime × variable × level space.
///
/// `variable` is the configuration key of the variable (e.g. `HGT`).
/// `level` is `Some` exactly when the variable's level type requires levels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerificationPoint {
    pub cycle: NaiveDateTime,
    pub leadtime: TimeDelta,
    pub variable: String,
    pub level: Option<Level>,
}

impl VerificationPoint {
    /// Variable label used in artifact names and diagnostics: `HGT-0900` or `REFC`.
    pub fn variable_label(&self) -> String {
        variable_label(&self.variable, self.level)
    }

    pub fn valid_time(&self) -> NaiveDateTime {
        self.cycle + self.leadtime
    }
}

pub(crate) fn variable_label(variable: &str, level: Option<Level>) -> String {
    match level {
        Some(level) => format!("{variable}-{level}"),
        None => variable.to_string(),
    }
}

impl fmt::Display for VerificationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} +{}h {}",
            format_cycle(&self.cycle),
            leadtime_hours(&self.leadtime),
            self.variable
        )?;
        if let Some(level) = self.level {
            write!(f, "@{level}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_display_pads_whole_numbers() {
        assert_eq!(Level::new(900.0).unwrap().to_string(), "0900");
        assert_eq!(Level::new(2.0).unwrap().to_string(), "0002");
        assert_eq!(Level::new(2.5).unwrap().to_string(), "2.5");
        assert!(Level::new(f64::NAN).is_none());
    }

    #[test]
    fn negative_zero_is_the_same_level_as_zero() {
        let zero = Level::new(0.0).unwrap();
        let neg = Level::new(-0.0).unwrap();
        assert_eq!(zero, neg);
        assert_eq!(neg.to_string(), "0000");
        assert!(neg.value().is_sign_positive());
    }

    #[test]
    fn level_types_know_whether_levels_are_required() {
        assert!(LevelType::IsobaricInhPa.requires_levels());
        assert!(LevelType::HeightAboveGround.requires_levels());
        assert!(!LevelType::Atmosphere.requires_levels());
        assert!(!LevelType::Surface.requires_levels());
    }
}
