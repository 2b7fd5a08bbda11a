// src/oracle/mod.rs

//! Artifact state oracle: decides whether a node's output already exists.
//!
//! Each task maps to one deterministic artifact path ([`layout`]). A node is
//! satisfied when that artifact passes the validity probe. Results are
//! cached per path for the lifetime of the oracle (one invocation), so
//! nodes sharing a backing artifact cost one storage round-trip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::config::model::ConfigFile;
use crate::dag::{SatisfactionCheck, TaskId};
use crate::errors::{Result, VxError};
use crate::fs::FileSystem;

pub mod layout;

pub use layout::ArtifactLayout;

/// What an existing artifact must look like to count as valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidityProbe {
    /// Any file at the path.
    Exists,
    /// A file with at least one byte.
    #[default]
    NonEmpty,
}

impl ValidityProbe {
    fn accepts(self, len: u64) -> bool {
        match self {
            ValidityProbe::Exists => true,
            ValidityProbe::NonEmpty => len > 0,
        }
    }
}

#[derive(Debug)]
pub struct ArtifactStateOracle {
    fs: Arc<dyn FileSystem>,
    layout: ArtifactLayout,
    probe: ValidityProbe,
    cache: Mutex<HashMap<PathBuf, bool>>,
}

impl ArtifactStateOracle {
    pub fn new(fs: Arc<dyn FileSystem>, layout: ArtifactLayout) -> Self {
        Self {
            fs,
            layout,
            probe: ValidityProbe::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(fs: Arc<dyn FileSystem>, cfg: &ConfigFile) -> Self {
        Self::new(fs, ArtifactLayout::from_config(cfg))
    }

    pub fn with_probe(mut self, probe: ValidityProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    pub fn path_for(&self, id: &TaskId) -> PathBuf {
        self.layout.path_for(id)
    }

    /// Check the node's artifact, surfacing storage failures.
    ///
    /// Failures are not cached; a later call probes again.
    pub fn check(&self, id: &TaskId) -> Result<bool> {
        let path = self.layout.path_for(id);
        self.check_path(&path)
    }

    fn check_path(&self, path: &Path) -> Result<bool> {
        if let Some(hit) = self.cached(path) {
            return Ok(hit);
        }

        let len = self.fs.file_len(path).map_err(|e| VxError::Oracle {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })?;
        let satisfied = len.is_some_and(|len| self.probe.accepts(len));

        debug!(path = %path.display(), ?len, satisfied, "probed artifact");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), satisfied);
        Ok(satisfied)
    }

    fn cached(&self, path: &Path) -> Option<bool> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
    }

    /// Whether the node's output is present and valid.
    ///
    /// An unreachable store counts as "not satisfied" so the work is redone.
    pub fn is_satisfied(&self, id: &TaskId) -> bool {
        match self.check(id) {
            Ok(satisfied) => satisfied,
            Err(err) => {
                warn!(task = %id, error = %err, "cannot check artifact; treating as not satisfied");
                false
            }
        }
    }
}

impl SatisfactionCheck for ArtifactStateOracle {
    fn is_satisfied(&self, id: &TaskId) -> bool {
        ArtifactStateOracle::is_satisfied(self, id)
    }
}
