//! dep CLI - fetch pinned dependencies
//!
//! Usage:
//!   dep                              Resolve the dependencies listed in .dep
//!   dep --depfile deps.txt           Use another manifest
//!   dep --registry https://host/deps Try this source before the configured ones
//!   dep --report report.json         Also write a JSON report of the run

use anyhow::{Context, Result};
use clap::Parser;
use dep_fetch::core::manifest::DEFAULT_MANIFEST;
use dep_fetch::{output, Config, Manifest, Overrides, Resolver};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dep")]
#[command(about = "Fetch pinned dependencies from an ordered list of repositories")]
#[command(version)]
struct Cli {
    /// The dependency file
    #[arg(long, env = "DEP_FILE", default_value = DEFAULT_MANIFEST)]
    depfile: PathBuf,

    /// Extra source (URL or directory) tried before the configured repositories
    #[arg(long = "registry", env = "DEP_REGISTRY", value_delimiter = ',')]
    registries: Vec<String>,

    /// Config file to use instead of ~/.deprc/config.toml and ./config.toml
    #[arg(short, long, env = "DEP_CONFIG")]
    config: Option<PathBuf>,

    /// Dependency output directory
    #[arg(long = "dep-dir", env = "DEP_DIRECTORY")]
    dep_dir: Option<PathBuf>,

    /// Path of the 7-Zip executable
    #[arg(long = "seven-zip", env = "DEP_SEVEN_ZIP")]
    seven_zip: Option<PathBuf>,

    /// Connect/read timeout for remote sources, in seconds
    #[arg(long, env = "DEP_HTTP_TIMEOUT", value_name = "SECS")]
    timeout: Option<u64>,

    /// Write a JSON report of every resolution to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let manifest = Manifest::load(&cli.depfile)?;

    let overrides = Overrides {
        registries: cli.registries,
        dependency_directory: cli.dep_dir,
        seven_zip_executable: cli.seven_zip,
        http_timeout_secs: cli.timeout,
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;

    if config.repositories.is_empty() {
        output::warning("no repositories configured; nothing can be resolved");
    }

    let report = Resolver::new(&config).run(&manifest)?;

    let unresolved: Vec<&str> = report.failed().map(|r| r.name.as_str()).collect();
    output::summary(
        report.resolved_count(),
        report.resolutions.len(),
        &unresolved,
    );

    if let Some(path) = cli.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }

    Ok(())
}
