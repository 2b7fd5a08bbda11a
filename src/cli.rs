// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `vxflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "vxflow",
    version,
    about = "Stage grids, compute verification statistics and plot them, skipping work already done.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(short = 'c', long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Goal to bring up to date; omit the name to list available goals.
    #[arg(
        short = 't',
        long,
        value_name = "TASK",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub task: Option<String>,

    /// Maximum concurrent tasks (0 = all available processing units).
    ///
    /// Overrides `[config].threads`.
    #[arg(short = 'n', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Validate the config and report which outputs exist, without running anything.
    #[arg(short = 'k', long)]
    pub check: bool,

    /// Print a pro-forma configuration and exit.
    #[arg(short = 's', long)]
    pub show: bool,

    /// Shorthand for `--log-level debug`.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `VXFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// `--log-level` wins over `--debug`.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        self.log_level
            .or(if self.debug { Some(LogLevel::Debug) } else { None })
    }

    /// The requested goal name, if a non-empty one was given.
    pub fn goal_name(&self) -> Option<&str> {
        self.task
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_task_flag_lists_goals() {
        let args = CliArgs::parse_from(["vxflow", "-t"]);
        assert_eq!(args.task.as_deref(), Some(""));
        assert_eq!(args.goal_name(), None);

        assert_eq!(args.config, PathBuf::from("vxflow.toml"));

        let args = CliArgs::parse_from(["vxflow", "--task", "stats", "-n", "3"]);
        assert_eq!(args.goal_name(), Some("stats"));
        assert_eq!(args.threads, Some(3));
    }

    #[test]
    fn log_level_overrides_debug() {
        let args = CliArgs::parse_from(["vxflow", "-d", "--log-level", "warn"]);
        assert_eq!(args.effective_log_level(), Some(LogLevel::Warn));
        let args = CliArgs::parse_from(["vxflow", "-d"]);
        assert_eq!(args.effective_log_level(), Some(LogLevel::Debug));
    }
}
