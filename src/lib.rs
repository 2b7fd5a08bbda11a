// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod oracle;
pub mod params;
pub mod types;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::dag::{GraphFlags, NodeStatus, Plan, TaskGraph};
use crate::engine::{resolve_concurrency, Runtime, RuntimeEvent};
use crate::exec::RunnerTable;
use crate::fs::{FileSystem, RealFileSystem};
use crate::oracle::ArtifactStateOracle;
use crate::types::Goal;

/// Pro-forma configuration printed by `--show`.
pub const PRO_FORMA_CONFIG: &str = include_str!("resources/vxflow.toml");

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and parameter expansion
/// - graph construction and goal resolution
/// - the artifact oracle and runners
/// - the runtime, with Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    if args.show {
        print!("{PRO_FORMA_CONFIG}");
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    let points = params::expand_points(&cfg)?;
    let graph = TaskGraph::build(&points, GraphFlags::from_config(&cfg))?;
    info!(
        points = points.len(),
        nodes = graph.len(),
        "configuration expanded"
    );

    let goal = match args.goal_name() {
        None if args.check => {
            println!("config ok: {} points, {} tasks", points.len(), graph.len());
            return Ok(ExitCode::SUCCESS);
        }
        None => {
            list_goals();
            return Ok(ExitCode::SUCCESS);
        }
        Some(name) => match name.parse::<Goal>() {
            Ok(goal) => goal,
            Err(err) => {
                error!("{err}");
                list_goals();
                return Ok(ExitCode::FAILURE);
            }
        },
    };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let oracle = ArtifactStateOracle::from_config(fs.clone(), &cfg);
    let goals = graph.goal_nodes(goal);

    if args.check {
        let plan = engine::dry_check(&graph, &goals, &oracle)?;
        print_check(goal, &plan, &oracle);
        return Ok(ExitCode::SUCCESS);
    }

    let runners = RunnerTable::from_config(&cfg, fs)?;
    for kind in runners.missing() {
        warn!(%kind, "no runner configured; tasks of this kind will fail if they need to run");
    }

    let max_concurrency = resolve_concurrency(args.threads.or(cfg.config.threads));
    info!(%goal, goals = goals.len(), max_concurrency, "running goal");

    let plan = Plan::compute(&graph, &goals, &oracle)?;
    let runtime = Runtime::new(&graph, plan, Arc::new(runners), max_concurrency);

    // Ctrl-C → graceful shutdown.
    {
        let tx = runtime.event_sender();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("interrupt received; finishing running tasks");
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let report = runtime.run().await?;
    report.log_summary();
    Ok(ExitCode::from(report.exit_code()))
}

/// Print the available goals to stdout.
pub fn list_goals() {
    println!("Tasks:");
    for goal in Goal::ALL {
        println!("  {:<16} {}", goal.name(), goal.description());
    }
}

/// Print what a run of `goal` would do.
fn print_check(goal: Goal, plan: &Plan, oracle: &ArtifactStateOracle) {
    println!("{goal}: {} satisfied, {} to run", plan.satisfied().count(), plan.to_run().len());
    for (id, status) in plan.statuses.iter() {
        let mark = match status {
            NodeStatus::Satisfied => "ok ",
            _ => "run",
        };
        println!("  {mark} {id}  {}", oracle.path_for(id).display());
    }
}
