// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::TaskKind;
use crate::errors::{Result, VxError};
use crate::exec::CommandTemplate;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::VxError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Structural checks on a raw configuration.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_variables(cfg)?;
    validate_names(cfg)?;
    validate_paths(cfg)?;
    validate_runners(cfg)?;
    Ok(())
}

fn ensure_has_variables(cfg: &RawConfigFile) -> Result<()> {
    if cfg.variables.is_empty() {
        return Err(VxError::ConfigError(
            "config must contain at least one [variables.<key>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    if cfg.baseline.name.trim().is_empty() {
        return Err(VxError::ConfigError(
            "[baseline].name must not be empty".to_string(),
        ));
    }
    if cfg.forecast.name.trim().is_empty() {
        return Err(VxError::ConfigError(
            "[forecast].name must not be empty".to_string(),
        ));
    }
    for (key, var) in cfg.variables.iter() {
        if var.name.trim().is_empty() {
            return Err(VxError::ConfigVariable {
                variable: key.clone(),
                reason: "name must not be empty".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths: [(&str, &Path); 3] = [
        ("grids_baseline", cfg.paths.grids_baseline.as_path()),
        ("grids_forecast", cfg.paths.grids_forecast.as_path()),
        ("run", cfg.paths.run.as_path()),
    ];
    for (key, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(VxError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_runners(cfg: &RawConfigFile) -> Result<()> {
    for kind in TaskKind::ALL {
        if let Some(raw) = cfg.runners.template_for(kind) {
            CommandTemplate::parse(kind, raw)?;
        }
    }
    Ok(())
}
