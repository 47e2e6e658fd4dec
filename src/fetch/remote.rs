//! Remote archive strategy
//!
//! Downloads `<source>/<name>-<version><ext>` into a staging file and extracts
//! it into `<root>/<name>`. One attempt per call; the agent's timeouts bound
//! every connect and read.

use super::staging::{remove_staged, StagingFile};
use super::{Acquired, FetchContext};
use crate::core::config::Config;
use crate::core::error::AcquireError;
use crate::core::manifest::Dependency;
use crate::core::output;
use crate::core::progress::{ProgressGuard, upgrade_to_bytes};
use crate::extract::ArchiveFormat;
use std::io::{Read, Write};
use std::path::Path;

pub const ZIP_EXT: &str = ".zip";
pub const SEVEN_Z_EXT: &str = ".7z";

const USER_AGENT: &str = concat!("dep-fetch/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP agent shared by every remote attempt of a run.
///
/// Connect and read timeouts both use `config.http_timeout`, so a stalled
/// server fails the attempt instead of blocking the run.
pub fn build_agent(config: &Config) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(config.http_timeout)
        .timeout_read(config.http_timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// `<source>/<name>-<version><ext>`
pub fn archive_url(source: &str, dep: &Dependency, ext: &str) -> String {
    format!("{}/{}{}", source.trim_end_matches('/'), dep.stem(), ext)
}

/// Download and extract one archive.
pub fn fetch_archive(
    ctx: &FetchContext<'_>,
    dep: &Dependency,
    source: &str,
    ext: &str,
) -> Result<Acquired, AcquireError> {
    let url = archive_url(source, dep, ext);

    let response = ctx.agent.get(&url).call().map_err(|e| match e {
        ureq::Error::Status(status, _) => AcquireError::Status {
            url: url.clone(),
            status,
        },
        ureq::Error::Transport(t) => AcquireError::Transport {
            url: url.clone(),
            message: t.to_string(),
        },
    })?;

    // ureq only errors on 4xx/5xx; anything else outside 2xx is a failure too
    if !(200..300).contains(&response.status()) {
        return Err(AcquireError::Status {
            url,
            status: response.status(),
        });
    }

    let mut staging =
        StagingFile::create(ctx.staging_dir, ext).map_err(|e| AcquireError::io(&url, e))?;
    let total_bytes = download_with_progress(response, &mut staging, &url)?;
    output::detail(&format!("downloaded {} ({} bytes)", url, total_bytes));

    let archive = staging
        .into_archive()
        .map_err(|e| AcquireError::io(&url, e))?;

    let dest = ctx
        .root
        .ensure_dependency_dir(&dep.name)
        .map_err(|e| AcquireError::io(ctx.root.dependency_dir(&dep.name).display().to_string(), e))?;

    let format = ArchiveFormat::from_extension(ext);
    ctx.extractor
        .extract(&archive, format, &dest)
        .map_err(|e| AcquireError::extract(&url, e))?;

    remove_staged(archive);

    Ok(Acquired {
        location: url,
        installed: dest,
        format,
    })
}

/// Stream the response body into the staging file.
fn download_with_progress(
    response: ureq::Response,
    staging: &mut StagingFile,
    url: &str,
) -> Result<u64, AcquireError> {
    let filename = Path::new(url)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let guard = ProgressGuard::spinner(&format!("downloading {}", filename));

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        upgrade_to_bytes(guard.bar(), len);
    }

    let mut reader = response.into_reader();
    let file = staging.as_file_mut();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| AcquireError::Transport {
            url: url.to_string(),
            message: format!("read error: {}", e),
        })?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| AcquireError::io(url, e))?;

        total_bytes += bytes_read as u64;
        guard.bar().set_position(total_bytes);
    }

    Ok(total_bytes)
}
