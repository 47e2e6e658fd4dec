//! Pinned dependency fetcher
//!
//! Reads a manifest of `<name> <version>` lines and materializes every
//! dependency under a local dependency directory, trying an ordered list of
//! repositories until one of them delivers.
//!
//! # Example Manifest
//!
//! ```text
//! # dependencies for the firmware build
//! zlib 1.3.1
//! bootloader 2.3.1
//! calibration 2024.06
//! ```
//!
//! # Sources and Strategies
//!
//! Each repository is a URL or a directory. For every repository, in order,
//! three strategies are tried:
//!
//! 1. `GET <repo>/<name>-<version>.zip`, extracted into `<dep>/<name>/`
//! 2. `GET <repo>/<name>-<version>.7z`, extracted flat with the 7-Zip tool
//! 3. `<repo>/<name>-<version>.*` on disk; `.zip`/`.7z` are extracted, any
//!    other file is copied to `<dep>/<name><ext>` unchanged
//!
//! The first success wins. If nothing works, the last error is reported and
//! the run continues with the next dependency.
//!
//! # Library Use
//!
//! ```no_run
//! use dep_fetch::{Config, Manifest, Resolver};
//!
//! let config = Config {
//!     repositories: vec!["https://deps.example.com/artifacts".into()],
//!     ..Config::default()
//! };
//! let manifest = Manifest::parse("zlib 1.3.1\n");
//! let report = Resolver::new(&config).run(&manifest)?;
//! println!("{} resolved", report.resolved_count());
//! # Ok::<(), dep_fetch::SetupError>(())
//! ```

pub mod core;
pub mod engine;
pub mod extract;
pub mod fetch;

pub use crate::core::config::{Config, Overrides};
pub use crate::core::error::{AcquireError, ExtractError, SetupError};
pub use crate::core::manifest::{Dependency, Manifest};
pub use crate::core::output;
pub use crate::engine::{Attempt, Outcome, Resolution, Resolver, RunReport};
pub use crate::extract::{ArchiveFormat, Extractor};
pub use crate::fetch::Strategy;
