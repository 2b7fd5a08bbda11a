// src/config/mod.rs

//! Configuration loading and validation for vxflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate structural invariants (`validate.rs`). Range and level rules
//!   are checked when the parameter space is expanded.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{
    BaselineSection, ConfigFile, ConfigSection, ForecastSection, PathsSection, RawConfigFile,
    RunnersSection, TimeSpec, VariableConfig,
};
pub use validate::validate_config;
