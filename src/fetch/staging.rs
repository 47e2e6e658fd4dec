//! Staging files
//!
//! A downloaded or disk-copied archive lives in a staging file until it has
//! been extracted. The file belongs to the strategy call that created it and
//! is deleted when the handle is dropped, whichever way the call returns.

use crate::core::output;
use std::fs::File;
use std::io;
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};

const STAGING_PREFIX: &str = ".dep-staging-";

/// A writable staging file, removed on drop.
pub struct StagingFile {
    file: NamedTempFile,
}

impl StagingFile {
    /// Create an empty staging file in `dir`, keeping `ext` as its suffix.
    pub fn create(dir: &Path, ext: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(ext)
            .tempfile_in(dir)?;
        Ok(Self { file })
    }

    pub fn as_file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Flush and close the handle so external tools can open the file.
    ///
    /// The returned [`TempPath`] still deletes the file when dropped.
    pub fn into_archive(self) -> io::Result<TempPath> {
        self.file.as_file().sync_all()?;
        Ok(self.file.into_temp_path())
    }
}

/// Delete an extracted staging file now, warning if that fails.
///
/// Dropping the [`TempPath`] would delete it too, but silently.
pub fn remove_staged(archive: TempPath) {
    let path = archive.to_path_buf();
    if let Err(e) = archive.close() {
        output::warning(&format!(
            "cannot remove staging file {}: {}",
            path.display(),
            e
        ));
    }
}
