//! Terminal output for a dependency run
//!
//! Progress goes to stdout, problems to stderr. Spinners and byte bars live
//! in [`crate::core::progress`].

use crate::core::manifest::Dependency;
use owo_colors::OwoColorize;
use std::fmt::Display;
use std::path::Path;

/// "==> Resolving 3 dependencies into dep"
pub fn run_header(count: usize, root: &Path) {
    let noun = if count == 1 { "dependency" } else { "dependencies" };
    let message = format!("Resolving {} {} into {}", count, noun, root.display());
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// "(1/3) zlib 1.3.1"
pub fn dependency_header(current: usize, total: usize, dep: &Dependency) {
    println!(
        "{} {} {}",
        format!("({}/{})", current, total).cyan(),
        dep.name.bold(),
        dep.version
    );
}

/// One failed attempt, dimmed under the dependency header.
pub fn attempt_failed(strategy: impl Display, location: &str, error: impl Display) {
    detail(&format!("{} {}: {}", strategy, location, error));
}

/// "==> Resolved zlib 1.3.1 from https://... (remote zip)"
pub fn resolved(dep: &Dependency, source: &str, strategy: impl Display) {
    let message = format!(
        "Resolved {} {} from {} ({})",
        dep.name, dep.version, source, strategy
    );
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Terminal failure of one dependency.
pub fn unresolved(dep: &Dependency, error: impl Display) {
    let message = format!(
        "Error while trying to download {} {}: {}",
        dep.name, dep.version, error
    );
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Final tally; names the unresolved dependencies, if any.
pub fn summary(resolved: usize, total: usize, unresolved: &[&str]) {
    if unresolved.is_empty() {
        let message = format!("resolved {} of {} dependencies", resolved, total);
        println!("{} {}", "==>".green().bold(), message.green());
    } else {
        println!(
            "{} resolved {} of {} dependencies (unresolved: {})",
            "::".cyan(),
            resolved,
            total,
            unresolved.join(", ").yellow()
        );
    }
}

/// Dimmed, indented line
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}
