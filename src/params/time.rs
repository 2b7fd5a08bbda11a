// src/params/time.rs

//! Cycle and leadtime parsing/formatting.
//!
//! All times are naive UTC. Cycles are written `YYYY-MM-DDTHH:MM:SS`,
//! durations (range steps and leadtimes) `H[:M[:S]]`, where hours may exceed 24.

use chrono::{NaiveDateTime, TimeDelta};

use crate::errors::{Result, VxError};

pub const CYCLE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_cycle(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), CYCLE_FORMAT).map_err(|e| {
        VxError::ConfigRange(format!(
            "invalid cycle '{s}' (expected YYYY-MM-DDTHH:MM:SS): {e}"
        ))
    })
}

/// Parse `H[:M[:S]]` into a non-negative duration.
pub fn parse_duration(s: &str) -> Result<TimeDelta> {
    let invalid = || VxError::ConfigRange(format!("invalid duration '{s}' (expected H[:M[:S]])"));

    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let mut fields = [0i64; 3];
    for (slot, part) in fields.iter_mut().zip(parts.iter()) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        *slot = part.parse::<i64>().map_err(|_| invalid())?;
    }

    let [hours, minutes, seconds] = fields;
    if parts.len() > 1 && (minutes > 59 || seconds > 59) {
        return Err(invalid());
    }

    TimeDelta::try_hours(hours)
        .and_then(|h| h.checked_add(&TimeDelta::minutes(minutes)))
        .and_then(|hm| hm.checked_add(&TimeDelta::seconds(seconds)))
        .ok_or_else(invalid)
}

pub fn format_cycle(dt: &NaiveDateTime) -> String {
    dt.format(CYCLE_FORMAT).to_string()
}

pub fn yyyymmdd(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%d").to_string()
}

pub fn hh(dt: &NaiveDateTime) -> String {
    dt.format("%H").to_string()
}

/// Leadtime as zero-padded whole hours, e.g. `006`.
pub fn leadtime_hours(td: &TimeDelta) -> String {
    format!("{:03}", td.num_hours())
}
