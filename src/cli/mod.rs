// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for replaying recorded sessions through the overlay pipeline.
//!
//! This module contains the command-line interface logic, including argument
//! parsing and the `run` command implementation.

// Modules
/// CLI arguments.
pub mod args;

/// Logging macros and verbosity control.
pub mod logging;

/// Overlay replay logic.
pub mod run;
