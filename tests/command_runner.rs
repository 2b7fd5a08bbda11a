#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use vxflow::config::ConfigFile;
use vxflow::dag::{GraphFlags, NodeStatus, TaskGraph, TaskKind};
use vxflow::engine::{ExecutionReport, execute};
use vxflow::exec::{RunnerErrorKind, RunnerTable};
use vxflow::fs::{FileSystem, RealFileSystem};
use vxflow::oracle::{ArtifactLayout, ArtifactStateOracle};
use vxflow::params::expand_points;
use vxflow::types::Goal;
use vxflow_test_utils::builders::ConfigFileBuilder;
use vxflow_test_utils::{init_tracing, with_timeout};

fn builder(root: &Path) -> ConfigFileBuilder {
    ConfigFileBuilder::new()
        .root(root)
        .variable("REFC", "refc")
        .runner(TaskKind::StageBaselineGrid, "printf grib > {output}")
        .runner(TaskKind::StageForecastGrid, "printf nc > {output}")
        .runner(TaskKind::ComputeStats, "cat {inputs} > {output}")
        .runner(TaskKind::MakePlot, "cat {inputs} > {output}")
}

async fn run(cfg: &ConfigFile, goal: Goal) -> (TaskGraph, ExecutionReport) {
    let points = expand_points(cfg).unwrap();
    let graph = TaskGraph::build(&points, GraphFlags::from_config(cfg)).unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let oracle = ArtifactStateOracle::from_config(fs.clone(), cfg);
    let runners = Arc::new(RunnerTable::from_config(cfg, fs).unwrap());
    let goals = graph.goal_nodes(goal);

    let report = with_timeout(execute(&graph, &goals, &oracle, runners, 2))
        .await
        .unwrap();
    (graph, report)
}

/// Hidden temp files left anywhere below `dir`.
fn leftovers(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(leftovers(&path));
        } else if entry.file_name().to_string_lossy().contains(".tmp-") {
            found.push(path.display().to_string());
        }
    }
    found
}

#[tokio::test]
async fn successful_commands_publish_their_artifacts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path()).build();

    let (graph, report) = run(&cfg, Goal::ComputeStats).await;

    assert_eq!(report.count(NodeStatus::Succeeded), 3);
    let layout = ArtifactLayout::from_config(&cfg);
    let stats = &graph.nodes_of_kind(TaskKind::ComputeStats)[0];
    // Inputs are passed baseline first.
    assert_eq!(fs::read_to_string(layout.path_for(stats)).unwrap(), "gribnc");
    assert!(leftovers(dir.path()).is_empty());
}

#[tokio::test]
async fn paths_with_spaces_and_quotes_stay_one_word() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("verif run's data");
    let cfg = builder(&root).build();

    let (graph, report) = run(&cfg, Goal::ComputeStats).await;

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.count(NodeStatus::Succeeded), 3);
    let stats = &graph.nodes_of_kind(TaskKind::ComputeStats)[0];
    let artifact = ArtifactLayout::from_config(&cfg).path_for(stats);
    assert!(artifact.starts_with(&root));
    assert_eq!(fs::read_to_string(artifact).unwrap(), "gribnc");
    // Nothing was written next to the root by a split word.
    let stray: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
    assert_eq!(stray.len(), 1);
    assert!(leftovers(dir.path()).is_empty());
}

#[tokio::test]
async fn baseline_compare_runs_stats_per_source() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path())
        .leadtimes(&["6"])
        .baseline_compare(true)
        .runner(TaskKind::ComputeStats, "printf {source} > {output}")
        .build();

    let (graph, report) = run(&cfg, Goal::ComputeStats).await;

    // Two baseline grids (the point and its analysis), one forecast grid, two stats.
    assert_eq!(report.count(NodeStatus::Succeeded), 5);
    let layout = ArtifactLayout::from_config(&cfg);
    for stats in graph.nodes_of_kind(TaskKind::ComputeStats) {
        let source = stats.source().unwrap().to_string();
        assert_eq!(fs::read_to_string(layout.path_for(&stats)).unwrap(), source);
    }
}

#[tokio::test]
async fn time_placeholders_are_rendered() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path())
        .leadtimes(&["6"])
        .runner(
            TaskKind::StageBaselineGrid,
            "echo {yyyymmdd}{hh}+{leadtime} {validtime} {baseline} > {output}",
        )
        .build();

    let (graph, report) = run(&cfg, Goal::StageBaseline).await;

    assert_eq!(report.exit_code(), 0);
    let grid = &graph.nodes_of_kind(TaskKind::StageBaselineGrid)[0];
    let written = fs::read_to_string(ArtifactLayout::from_config(&cfg).path_for(grid)).unwrap();
    assert_eq!(written, "2024121918+006 2024-12-20T00:00:00 GFS\n");
}

#[tokio::test]
async fn failing_command_reports_exit_code_and_stderr() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path())
        .runner(
            TaskKind::StageForecastGrid,
            "printf partial > {output}; echo 'no such grid' >&2; exit 3",
        )
        .build();

    let (graph, report) = run(&cfg, Goal::ComputeStats).await;

    let forecast = &graph.nodes_of_kind(TaskKind::StageForecastGrid)[0];
    let node = &report.nodes[forecast];
    assert_eq!(node.status, NodeStatus::Failed);
    let err = node.error.as_ref().unwrap();
    assert_eq!(err.kind, RunnerErrorKind::Exit(3));
    assert!(err.message.contains("no such grid"));

    assert!(!ArtifactLayout::from_config(&cfg).path_for(forecast).exists());
    assert!(leftovers(dir.path()).is_empty(), "partial output removed");
    assert_eq!(report.count(NodeStatus::Skipped), 1);
}

#[tokio::test]
async fn exiting_zero_without_output_is_a_publish_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path())
        .runner(TaskKind::StageBaselineGrid, "echo would write {output}")
        .build();

    let (graph, report) = run(&cfg, Goal::StageBaseline).await;

    let grid = &graph.nodes_of_kind(TaskKind::StageBaselineGrid)[0];
    let err = report.nodes[grid].error.as_ref().unwrap();
    assert_eq!(err.kind, RunnerErrorKind::Publish);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn rerun_finds_everything_satisfied() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = builder(dir.path()).leadtimes(&["0", "6"]).build();

    let (_, first) = run(&cfg, Goal::MakePlots).await;
    assert_eq!(first.count(NodeStatus::Succeeded), 7);

    // A command that would fail proves nothing is run the second time.
    let again = builder(dir.path())
        .leadtimes(&["0", "6"])
        .runner(TaskKind::MakePlot, "exit 1 # {output}")
        .build();
    let (_, second) = run(&again, Goal::MakePlots).await;

    assert_eq!(second.nodes.len(), 1);
    assert_eq!(second.count(NodeStatus::Satisfied), 1);
    assert_eq!(second.exit_code(), 0);
}
