//! Acquisition strategies
//!
//! Each strategy tries to get one dependency out of one source and install it
//! under the dependency root:
//!
//! - **remote zip**: `GET <source>/<name>-<version>.zip`, then extract
//! - **remote 7z**: `GET <source>/<name>-<version>.7z`, then extract with 7-Zip
//! - **disk copy**: find `<source>/<name>-<version>.*` on disk; archives are
//!   extracted, anything else is copied as a single file
//!
//! Strategies never retry. A failure is returned as an [`AcquireError`] and
//! the engine moves on to the next strategy or source.

pub mod disk;
pub mod remote;
pub mod staging;

use crate::core::error::AcquireError;
use crate::core::manifest::Dependency;
use crate::engine::destination::DependencyRoot;
use crate::extract::{ArchiveFormat, Extractor};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Everything a strategy needs besides the dependency and source.
pub struct FetchContext<'a> {
    pub agent: &'a ureq::Agent,
    pub extractor: &'a Extractor,
    pub root: &'a DependencyRoot,
    pub staging_dir: &'a Path,
}

/// A successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    /// URL or file the payload came from
    pub location: String,
    /// Directory (or file, for raw transfers) it was installed to
    pub installed: PathBuf,
    pub format: ArchiveFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RemoteZip,
    RemoteSevenZ,
    DiskCopy,
}

impl Strategy {
    /// Order in which strategies are tried against every source.
    pub const ORDER: [Strategy; 3] = [Strategy::RemoteZip, Strategy::RemoteSevenZ, Strategy::DiskCopy];

    pub fn label(self) -> &'static str {
        match self {
            Strategy::RemoteZip => "remote zip",
            Strategy::RemoteSevenZ => "remote 7z",
            Strategy::DiskCopy => "disk copy",
        }
    }

    /// Try to acquire `dep` from `source` with this strategy.
    pub fn acquire(
        self,
        ctx: &FetchContext<'_>,
        dep: &Dependency,
        source: &str,
    ) -> Result<Acquired, AcquireError> {
        match self {
            Strategy::RemoteZip => remote::fetch_archive(ctx, dep, source, remote::ZIP_EXT),
            Strategy::RemoteSevenZ => remote::fetch_archive(ctx, dep, source, remote::SEVEN_Z_EXT),
            Strategy::DiskCopy => disk::copy_from_disk(ctx, dep, source),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
