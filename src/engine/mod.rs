//! Resolution engine
//!
//! For every dependency in the manifest, sources are tried in configured
//! order and, within a source, strategies in [`Strategy::ORDER`]. The first
//! success resolves the dependency; later strategies and sources are not
//! touched. When everything fails, the last error is reported and the run
//! moves on to the next dependency.
//!
//! Dependencies are independent: a failure never rolls back or aborts the
//! others. Only setup problems (lock, dependency directory) stop a run.

pub mod destination;

use crate::core::config::Config;
use crate::core::error::{AcquireError, SetupError};
use crate::core::lock::acquire_run_lock;
use crate::core::manifest::{Dependency, Manifest};
use crate::core::output;
use crate::extract::{ArchiveFormat, Extractor};
use crate::fetch::{remote, Acquired, FetchContext, Strategy};
use destination::{is_safe_name, DependencyRoot};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::path::PathBuf;

/// One failed (source, strategy) attempt.
#[derive(Debug, Serialize)]
pub struct Attempt {
    pub source: String,
    pub strategy: Strategy,
    pub location: String,
    #[serde(serialize_with = "display_string")]
    pub error: AcquireError,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Resolved {
        source: String,
        strategy: Strategy,
        location: String,
        format: ArchiveFormat,
        installed: PathBuf,
    },
    Failed {
        error: String,
    },
}

/// What happened to one dependency.
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub name: String,
    pub version: String,
    pub outcome: Outcome,
    /// Failed attempts, in the order they were made
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self.outcome, Outcome::Resolved { .. })
    }

    /// Source the dependency was resolved from, if any.
    pub fn source(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Resolved { source, .. } => Some(source),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn last_error(&self) -> Option<&AcquireError> {
        self.attempts.last().map(|a| &a.error)
    }
}

/// Result of a whole run.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub resolutions: Vec<Resolution>,
}

impl RunReport {
    pub fn resolved_count(&self) -> usize {
        self.resolutions.iter().filter(|r| r.is_resolved()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &Resolution> {
        self.resolutions.iter().filter(|r| !r.is_resolved())
    }

    pub fn get(&self, name: &str) -> Option<&Resolution> {
        self.resolutions.iter().find(|r| r.name == name)
    }
}

/// Resolves a manifest against the configured sources.
pub struct Resolver<'a> {
    config: &'a Config,
    agent: ureq::Agent,
    extractor: Extractor,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            agent: remote::build_agent(config),
            extractor: Extractor::from_config(config),
        }
    }

    /// Run a full resolution.
    ///
    /// Takes the run lock, resets the dependency directory, then resolves
    /// every dependency. Per-dependency failures are part of the report, not
    /// an `Err`.
    pub fn run(&self, manifest: &Manifest) -> Result<RunReport, SetupError> {
        let _lock = acquire_run_lock(&self.config.dependency_directory)?;
        let staging_dir = self.staging_dir()?;
        let root = DependencyRoot::reset(&self.config.dependency_directory)?;

        let total = manifest.len();
        output::run_header(total, root.path());

        let resolutions = manifest
            .dependencies()
            .enumerate()
            .map(|(i, dep)| {
                output::dependency_header(i + 1, total, &dep);
                self.resolve(&root, &staging_dir, &dep)
            })
            .collect();

        Ok(RunReport { resolutions })
    }

    /// Resolve a single dependency into `root`.
    pub fn resolve(
        &self,
        root: &DependencyRoot,
        staging_dir: &std::path::Path,
        dep: &Dependency,
    ) -> Resolution {
        if !is_safe_name(&dep.name) {
            let error = format!("'{}' is not a valid dependency name", dep.name);
            output::unresolved(dep, &error);
            return failed(dep, Vec::new(), error);
        }

        let ctx = FetchContext {
            agent: &self.agent,
            extractor: &self.extractor,
            root,
            staging_dir,
        };

        let mut attempts = Vec::new();
        for source in &self.config.repositories {
            for strategy in Strategy::ORDER {
                match strategy.acquire(&ctx, dep, source) {
                    Ok(acquired) => {
                        output::resolved(dep, source, strategy);
                        return resolved(dep, source, strategy, acquired, attempts);
                    }
                    Err(error) => {
                        output::attempt_failed(strategy, error.location(), &error);
                        // The next attempt starts from an empty slot
                        discard_partial(root, &dep.name);
                        attempts.push(Attempt {
                            source: source.clone(),
                            strategy,
                            location: error.location().to_string(),
                            error,
                        });
                    }
                }
            }
        }

        let error = match attempts.last() {
            Some(attempt) => attempt.error.to_string(),
            None => "no repositories configured".to_string(),
        };
        output::unresolved(dep, &error);
        failed(dep, attempts, error)
    }

    fn staging_dir(&self) -> Result<PathBuf, SetupError> {
        let dir = self
            .config
            .staging_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dir).map_err(|source| SetupError::StagingDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

/// Drop whatever a failed attempt left in `<root>/<name>`.
fn discard_partial(root: &DependencyRoot, name: &str) {
    if let Err(e) = root.discard(name) {
        output::warning(&format!(
            "cannot clean up {}: {}",
            root.dependency_dir(name).display(),
            e
        ));
    }
}

fn resolved(
    dep: &Dependency,
    source: &str,
    strategy: Strategy,
    acquired: Acquired,
    attempts: Vec<Attempt>,
) -> Resolution {
    Resolution {
        name: dep.name.clone(),
        version: dep.version.clone(),
        outcome: Outcome::Resolved {
            source: source.to_string(),
            strategy,
            location: acquired.location,
            format: acquired.format,
            installed: acquired.installed,
        },
        attempts,
    }
}

fn failed(dep: &Dependency, attempts: Vec<Attempt>, error: String) -> Resolution {
    Resolution {
        name: dep.name.clone(),
        version: dep.version.clone(),
        outcome: Outcome::Failed { error },
        attempts,
    }
}

fn display_string<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
