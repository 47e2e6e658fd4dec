//! Archive extraction
//!
//! Unpacks a staged payload into a dependency's destination:
//!
//! - **zip**: native extraction with the `zip` crate, directory layout kept
//! - **7z**: delegated to the external 7-Zip tool, extracted flat
//! - **raw**: anything else, copied byte-for-byte without decompression

use crate::core::config::Config;
use crate::core::error::ExtractError;
use crate::core::output;
use crate::core::progress::ProgressGuard;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Container format of a dependency payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    SevenZ,
    /// Not an archive; installed as a single file
    Raw,
}

impl ArchiveFormat {
    /// Format implied by a file extension such as `.zip` or `.tar.7z`.
    ///
    /// Only the last suffix counts and matching is case-insensitive. Anything
    /// unrecognized is [`ArchiveFormat::Raw`].
    pub fn from_extension(ext: &str) -> Self {
        let ext = ext.to_ascii_lowercase();
        let last = ext.rsplit('.').next().unwrap_or_default();
        match last {
            "zip" => ArchiveFormat::Zip,
            "7z" => ArchiveFormat::SevenZ,
            _ => ArchiveFormat::Raw,
        }
    }
}

/// Unpacks archives. Holds the path of the external 7-Zip tool.
#[derive(Debug, Clone)]
pub struct Extractor {
    seven_zip: PathBuf,
}

impl Extractor {
    pub fn new(seven_zip: impl Into<PathBuf>) -> Self {
        Self {
            seven_zip: seven_zip.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.seven_zip_executable)
    }

    /// Unpack `archive` into `dest`.
    ///
    /// For [`ArchiveFormat::Zip`] and [`ArchiveFormat::SevenZ`], `dest` is a
    /// directory and is created (with parents) first. For
    /// [`ArchiveFormat::Raw`], `dest` is the target file path.
    pub fn extract(
        &self,
        archive: &Path,
        format: ArchiveFormat,
        dest: &Path,
    ) -> Result<(), ExtractError> {
        let filename = archive
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "archive".to_string());

        if format == ArchiveFormat::Raw {
            copy_raw(archive, dest)?;
            output::detail(&format!("copied {} to {}", filename, dest.display()));
            return Ok(());
        }

        std::fs::create_dir_all(dest).map_err(|e| ExtractError::io(dest, e))?;

        {
            let _spinner = ProgressGuard::spinner(&format!("extracting {}", filename));
            match format {
                ArchiveFormat::SevenZ => self.extract_seven_zip(archive, dest)?,
                _ => extract_zip(archive, dest)?,
            }
        }

        output::detail(&format!("extracted {} to {}", filename, dest.display()));
        Ok(())
    }

    /// Run `7z e <archive> -o<dest> -r -t7z -aoa`.
    ///
    /// `e` extracts without the archive's directory hierarchy, `-r` recurses
    /// into subfolders and `-aoa` overwrites existing files.
    fn extract_seven_zip(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        let mut out_flag = OsString::from("-o");
        out_flag.push(dest);

        let result = Command::new(&self.seven_zip)
            .arg("e")
            .arg(archive)
            .arg(out_flag)
            .args(["-r", "-t7z", "-aoa"])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExtractError::ToolLaunch {
                tool: self.seven_zip.clone(),
                source,
            })?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(ExtractError::ToolFailed {
                tool: self.seven_zip.clone(),
                code: result.status.code(),
                output: combined,
            });
        }

        Ok(())
    }
}

fn copy_raw(src: &Path, dest: &Path) -> Result<(), ExtractError> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }
    std::fs::copy(src, dest).map_err(|e| ExtractError::io(dest, e))?;
    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;

    let zip_err = |source| ExtractError::Zip {
        archive: archive_path.to_path_buf(),
        source,
    };

    let mut archive = zip::ZipArchive::new(file).map_err(zip_err)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;

        // Entries that would land outside `dest` are skipped
        let outpath = match entry.enclosed_name() {
            Some(path) => dest.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath).map_err(|e| ExtractError::io(&outpath, e))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }

        let mut outfile = File::create(&outpath).map_err(|e| ExtractError::io(&outpath, e))?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| ExtractError::io(&outpath, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode)).ok();
            }
        }
    }

    Ok(())
}
