// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory artifact store for tests.
///
/// Clones share state. Paths under an "unreachable" prefix fail every
/// operation, simulating a store that cannot be consulted.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    unreachable: Arc<Mutex<Vec<PathBuf>>>,
    probes: Arc<AtomicUsize>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files().contains_key(path.as_ref())
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Make every path below `prefix` fail as if the store were offline.
    pub fn set_unreachable(&self, prefix: impl AsRef<Path>) {
        self.unreachable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prefix.as_ref().to_path_buf());
    }

    /// Number of `file_len` calls made so far.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_reachable(&self, path: &Path) -> Result<()> {
        let unreachable = self.unreachable.lock().unwrap_or_else(PoisonError::into_inner);
        if unreachable.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(anyhow!("store unreachable: {:?}", path));
        }
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn file_len(&self, path: &Path) -> Result<Option<u64>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.check_reachable(path)?;
        Ok(self.files().get(path).map(|c| c.len() as u64))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_reachable(path)?;
        self.add_file(path, contents);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.check_reachable(from)?;
        self.check_reachable(to)?;
        let mut files = self.files();
        let content = files
            .remove(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        files.insert(to.to_path_buf(), content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check_reachable(path)?;
        self.files().remove(path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        // Directories are implicit.
        self.check_reachable(path)
    }
}
