// src/exec/template.rs

//! `{placeholder}` command templates for the shell runner.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::model::RunnersSection;
use crate::dag::TaskKind;
use crate::errors::{Result, VxError};

/// `{name}` placeholders; a leading `$` marks a shell expansion (`${HOME}`),
/// which is left alone.
static PLACEHOLDER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(\$?)\{([a-z_]+)\}"));

const COMMON: &[&str] = &[
    "output", "inputs", "cycle", "yyyymmdd", "hh", "baseline", "forecast",
];
const TIMED: &[&str] = &["leadtime", "validtime"];
const VARIABLE: &[&str] = &["variable", "name", "level_type", "level"];

/// Placeholders a template for `kind` may use.
pub fn placeholders_for(kind: TaskKind) -> Vec<&'static str> {
    let mut names = COMMON.to_vec();
    match kind {
        TaskKind::StageBaselineGrid | TaskKind::StageForecastGrid => names.extend(TIMED),
        TaskKind::ComputeStats => {
            names.extend(TIMED);
            names.extend(VARIABLE);
            names.push("source");
        }
        TaskKind::MakePlot => names.extend(VARIABLE),
    }
    names
}

fn placeholder_regex() -> Result<&'static Regex> {
    PLACEHOLDER
        .as_ref()
        .map_err(|e| VxError::ConfigError(format!("placeholder pattern: {e}")))
}

/// A validated command template for one task kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    kind: TaskKind,
    raw: String,
}

impl CommandTemplate {
    /// Validate `raw` for `kind`: every placeholder must be known for the
    /// kind, and `{output}` must appear.
    pub fn parse(kind: TaskKind, raw: &str) -> Result<Self> {
        let key = RunnersSection::key_for(kind);
        if raw.trim().is_empty() {
            return Err(VxError::ConfigError(format!(
                "[runners].{key} must not be empty"
            )));
        }

        let allowed = placeholders_for(kind);
        let mut has_output = false;

        for caps in placeholder_regex()?.captures_iter(raw) {
            if &caps[1] == "$" {
                continue;
            }
            let name = &caps[2];
            if !allowed.iter().any(|known| *known == name) {
                return Err(VxError::ConfigError(format!(
                    "[runners].{key} uses unknown placeholder '{{{name}}}' (allowed: {})",
                    allowed.join(", ")
                )));
            }
            has_output |= name == "output";
        }

        if !has_output {
            return Err(VxError::ConfigError(format!(
                "[runners].{key} must write its result to {{output}}"
            )));
        }

        Ok(Self {
            kind,
            raw: raw.to_string(),
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Substitute placeholders. Names without a value are kept verbatim.
    pub fn render(&self, values: &HashMap<&str, String>) -> String {
        let Ok(re) = placeholder_regex() else {
            return self.raw.clone();
        };

        re.replace_all(&self.raw, |caps: &Captures<'_>| {
            if &caps[1] == "$" {
                return caps[0].to_string();
            }
            match values.get(&caps[2]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
    }
}
