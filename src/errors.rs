// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VxError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A cycle/leadtime range or list cannot be expanded.
    #[error("Invalid range: {0}")]
    ConfigRange(String),

    /// A variable declaration violates its level-type rules.
    #[error("Invalid variable '{variable}': {reason}")]
    ConfigVariable { variable: String, reason: String },

    /// Unknown goal or inconsistent dependency declaration.
    #[error("Task graph error: {0}")]
    GraphConstruction(String),

    /// Storage could not be consulted while checking an artifact.
    #[error("Artifact store unreachable for {path:?}: {message}")]
    Oracle { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, VxError>;
