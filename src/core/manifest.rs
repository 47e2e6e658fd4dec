//! Dependency manifest
//!
//! One dependency per line, `<name> <version>`:
//!
//! ```text
//! # runtime libraries
//! zlib 1.3.1
//! openssl 3.0.13
//! ```
//!
//! Lines starting with `#` are comments. Lines that are not exactly two
//! whitespace-separated tokens are skipped without complaint.

use crate::core::error::SetupError;
use std::collections::BTreeMap;
use std::path::Path;

/// Default manifest file name
pub const DEFAULT_MANIFEST: &str = ".dep";

/// A pinned dependency: exact name and version strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `<name>-<version>`, the stem every source uses for this dependency.
    pub fn stem(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

/// Parsed manifest: dependency name -> requested version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Parse manifest text. Never fails; bad lines are dropped.
    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            if let (Some(name), Some(version), None) = (tokens.next(), tokens.next(), tokens.next())
            {
                // Later lines win, like re-assigning a map key.
                entries.insert(name.to_string(), version.to_string());
            }
        }
        Self { entries }
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let text = std::fs::read_to_string(path).map_err(|source| SetupError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requested version for `name`, if declared.
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = Dependency> + '_ {
        self.entries
            .iter()
            .map(|(name, version)| Dependency::new(name.as_str(), version.as_str()))
    }
}

impl FromIterator<(String, String)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
