//! Dependency directory lifecycle
//!
//! The root is wiped and recreated once per run. Per-dependency
//! subdirectories are created lazily by whichever strategy first writes into
//! them; creating one that already exists is a no-op.

use crate::core::error::SetupError;
use std::io;
use std::path::{Path, PathBuf};

/// The on-disk root every resolved dependency lands in.
#[derive(Debug)]
pub struct DependencyRoot {
    path: PathBuf,
}

impl DependencyRoot {
    /// Delete `path` recursively if it exists, then create it empty.
    ///
    /// Fails if `path` exists but is not a directory, or on any IO error.
    pub fn reset(path: &Path) -> Result<Self, SetupError> {
        match std::fs::symlink_metadata(path) {
            Ok(md) if md.is_dir() => {
                std::fs::remove_dir_all(path).map_err(|source| SetupError::ResetRoot {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            Ok(_) => return Err(SetupError::NotADirectory(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SetupError::ResetRoot {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        std::fs::create_dir_all(path).map_err(|source| SetupError::CreateRoot {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<root>/<name>`, whether or not it exists yet.
    pub fn dependency_dir(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Create `<root>/<name>` if missing and return it.
    pub fn ensure_dependency_dir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.dependency_dir(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// `<root>/<name><ext>`, the target of a raw transfer.
    pub fn raw_path(&self, name: &str, ext: &str) -> PathBuf {
        self.path.join(format!("{}{}", name, ext))
    }

    /// Remove whatever a failed dependency left in `<root>/<name>`.
    pub fn discard(&self, name: &str) -> io::Result<()> {
        let dir = self.dependency_dir(name);
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Names of everything currently in the root, sorted.
    pub fn entries(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// A dependency name must be a single plain path component.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_whitespace)
}
