//! Error types for a dependency run.
//!
//! Only [`SetupError`] aborts a run. [`AcquireError`] and [`ExtractError`] are
//! recovered at the strategy boundary and turn into "try the next one".

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while unpacking a staged archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("zip archive {} is unreadable: {source}", .archive.display())]
    Zip {
        archive: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot run {}: {source}", .tool.display())]
    ToolLaunch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {}: {}", .tool.display(), exit_label(.code), .output.trim())]
    ToolFailed {
        tool: PathBuf,
        code: Option<i32>,
        output: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => "a signal".to_string(),
    }
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A single strategy failed for a single source.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("dependency could not be found: {pattern}")]
    NotFound { pattern: String },

    #[error("invalid search pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("IO error for {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot unpack {location}: {source}")]
    Extract {
        location: String,
        #[source]
        source: ExtractError,
    },
}

impl AcquireError {
    /// The URL or path the failed attempt was aimed at.
    pub fn location(&self) -> &str {
        match self {
            AcquireError::Status { url, .. } | AcquireError::Transport { url, .. } => url,
            AcquireError::NotFound { pattern } | AcquireError::Pattern { pattern, .. } => pattern,
            AcquireError::Io { location, .. } | AcquireError::Extract { location, .. } => location,
        }
    }

    pub(crate) fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        AcquireError::Io {
            location: location.into(),
            source,
        }
    }

    pub(crate) fn extract(location: impl Into<String>, source: ExtractError) -> Self {
        AcquireError::Extract {
            location: location.into(),
            source,
        }
    }
}

/// Fatal errors: the run stops before (or instead of) resolving anything.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("dependency directory {} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot clear dependency directory {}: {source}", .path.display())]
    ResetRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create dependency directory {}: {source}", .path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create staging directory {}: {source}", .path.display())]
    StagingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read dependency file {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config file {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "another run holds {}. If this is incorrect, delete it",
        .0.display()
    )]
    Locked(PathBuf),

    #[error("cannot create lock file {}: {source}", .path.display())]
    LockFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
