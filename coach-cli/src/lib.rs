//! # coach-cli
//!
//! Command-line front end for conversation memory: argument parsing, config loading,
//! logging and the command handlers behind the `coachmem` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logger;

pub use cli::{Cli, Commands, RoleArg};
pub use commands::{build_manager, run};
pub use config::AppConfig;
pub use logger::init_tracing;
