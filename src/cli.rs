// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rewind`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rewind",
    version,
    about = "Show which graph nodes a build would restart when an action loses inputs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph description (TOML).
    #[arg(long, value_name = "PATH", default_value = "Rewind.toml")]
    pub graph: String,

    /// Key of the failing action, e.g. `//pkg:lib#0`.
    #[arg(long, value_name = "KEY", required_unless_present = "dry_run")]
    pub action: Option<String>,

    /// Exec path of an input the action lost (repeatable).
    #[arg(long = "lost", value_name = "PATH")]
    pub lost: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REWIND_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't compute a plan.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
