//! Core infrastructure for a dependency run
//!
//! Configuration, manifest parsing, errors, locking and terminal output.

pub mod config;
pub mod error;
pub mod lock;
pub mod manifest;
pub mod output;
pub mod progress;
