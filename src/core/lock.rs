//! Run lock
//!
//! A run deletes and recreates the whole dependency directory, so two runs
//! against the same directory must not overlap.

use crate::core::error::SetupError;
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// How old a lock file can be before it's considered stale (2 hours)
const STALE_LOCK_AGE_SECS: u64 = 7200;

fn is_stale_lock(lock_path: &Path) -> bool {
    if let Ok(metadata) = std::fs::metadata(lock_path)
        && let Ok(modified) = metadata.modified()
        && let Ok(age) = std::time::SystemTime::now().duration_since(modified)
    {
        return age.as_secs() > STALE_LOCK_AGE_SECS;
    }
    false
}

/// Lock file guarding `dependency_directory`: a sibling named `<dir>.lock`.
pub fn lock_path_for(dependency_directory: &Path) -> PathBuf {
    let mut name = dependency_directory
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "dep".into());
    name.push(".lock");
    dependency_directory.with_file_name(name)
}

/// Take an exclusive lock for a run writing into `dependency_directory`.
/// Returns a guard that releases the lock when dropped.
pub fn acquire_run_lock(dependency_directory: &Path) -> Result<RunLock, SetupError> {
    let lock_path = lock_path_for(dependency_directory);

    if lock_path.exists() && is_stale_lock(&lock_path) {
        let _ = std::fs::remove_file(&lock_path);
    }

    if let Some(parent) = lock_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| SetupError::LockFile {
            path: lock_path.clone(),
            source,
        })?;
    }

    let lock_file = File::create(&lock_path).map_err(|source| SetupError::LockFile {
        path: lock_path.clone(),
        source,
    })?;

    if lock_file.try_lock_exclusive().is_err() {
        return Err(SetupError::Locked(lock_path));
    }

    Ok(RunLock {
        _file: lock_file,
        path: lock_path,
    })
}

/// RAII guard for the run lock - releases the lock and deletes the file when dropped
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
