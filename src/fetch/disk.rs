//! Local disk strategy
//!
//! Treats the source as a directory and looks for `<name>-<version>.*` in it.
//! When several files match, the lexicographically first path wins, so the
//! pick does not depend on directory listing order.
//!
//! `.zip` and `.7z` payloads are staged and extracted into `<root>/<name>`.
//! Anything else is copied as-is to `<root>/<name><ext>`, where `<ext>` is
//! everything after `<name>-<version>` in the matched file name. That keeps
//! compound suffixes whole (`foo-1.0.0.tar.gz` installs as `foo.tar.gz`),
//! unlike the archive format check, which only reads the last suffix.

use super::staging::{remove_staged, StagingFile};
use super::{Acquired, FetchContext};
use crate::core::error::AcquireError;
use crate::core::manifest::Dependency;
use crate::core::output;
use crate::extract::ArchiveFormat;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Glob pattern for `dep` inside `source`, with glob metacharacters escaped.
pub fn search_pattern(source: &str, dep: &Dependency) -> String {
    let dir = glob::Pattern::escape(source);
    let sep = if dir.is_empty() || dir.ends_with('/') || dir.ends_with('\\') {
        ""
    } else {
        "/"
    };
    format!("{}{}{}.*", dir, sep, glob::Pattern::escape(&dep.stem()))
}

/// First file matching `<source>/<name>-<version>.*`, in sorted order.
pub fn find_candidate(source: &str, dep: &Dependency) -> Result<PathBuf, AcquireError> {
    let pattern = search_pattern(source, dep);
    let mut matches: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| AcquireError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    matches.sort();
    matches
        .into_iter()
        .next()
        .ok_or(AcquireError::NotFound { pattern })
}

/// Extension of a matched payload: what follows `<name>-<version>` in its name.
///
/// `foo-1.0.0.tar.gz` gives `.tar.gz`.
pub fn payload_extension(path: &Path, dep: &Dependency) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match file_name.strip_prefix(&dep.stem()) {
        Some(rest) => rest.to_string(),
        None => path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    }
}

/// Copy (and if needed extract) a dependency found on disk.
pub fn copy_from_disk(
    ctx: &FetchContext<'_>,
    dep: &Dependency,
    source: &str,
) -> Result<Acquired, AcquireError> {
    let path = find_candidate(source, dep)?;
    let location = path.display().to_string();
    let ext = payload_extension(&path, dep);
    let format = ArchiveFormat::from_extension(&ext);

    let installed = match format {
        ArchiveFormat::Raw => {
            let dest = ctx.root.raw_path(&dep.name, &ext);
            if let Err(e) = ctx.extractor.extract(&path, ArchiveFormat::Raw, &dest) {
                remove_partial_file(&dest);
                return Err(AcquireError::extract(location, e));
            }
            dest
        }
        ArchiveFormat::Zip | ArchiveFormat::SevenZ => {
            let archive = stage_copy(&path, ctx.staging_dir, &ext)
                .map_err(|e| AcquireError::io(&location, e))?;

            let dest = ctx
                .root
                .ensure_dependency_dir(&dep.name)
                .map_err(|e| AcquireError::io(&location, e))?;

            ctx.extractor
                .extract(&archive, format, &dest)
                .map_err(|e| AcquireError::extract(&location, e))?;

            remove_staged(archive);
            dest
        }
    };

    Ok(Acquired {
        location,
        installed,
        format,
    })
}

/// Remove a half-written raw copy. Nothing there is fine.
fn remove_partial_file(dest: &Path) {
    match std::fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => output::warning(&format!(
            "cannot remove partial copy {}: {}",
            dest.display(),
            e
        )),
    }
}

fn stage_copy(src: &Path, staging_dir: &Path, ext: &str) -> std::io::Result<tempfile::TempPath> {
    let mut staging = StagingFile::create(staging_dir, ext)?;
    let mut input = File::open(src)?;
    std::io::copy(&mut input, staging.as_file_mut())?;
    staging.into_archive()
}
