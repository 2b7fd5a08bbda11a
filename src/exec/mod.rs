// src/exec/mod.rs

//! Task runners.
//!
//! - [`runner`] defines the `TaskRunner` trait, the classified
//!   `RunnerError`, and the exhaustive `RunnerTable` the runtime dispatches
//!   through.
//! - [`template`] validates and renders `{placeholder}` command templates.
//! - [`command`] runs rendered templates with `tokio::process::Command` and
//!   publishes the command's output atomically.

pub mod command;
pub mod runner;
pub mod template;

pub use command::{CommandRunner, RunContext};
pub use runner::{RunnerError, RunnerErrorKind, RunnerFuture, RunnerTable, TaskRunner};
pub use template::CommandTemplate;
