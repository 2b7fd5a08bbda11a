mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, grid_key};
use vxflow::dag::{NodeStatus, Plan, TaskId, TaskKind};
use vxflow::engine::{ExecutionReport, Runtime, RuntimeEvent, execute};
use vxflow::exec::{RunnerErrorKind, RunnerTable};
use vxflow::types::Goal;
use vxflow_test_utils::builders::ConfigFileBuilder;
use vxflow_test_utils::{FakeRunner, init_tracing, with_timeout};

fn two_by_two() -> Fixture {
    Fixture::new(
        ConfigFileBuilder::new()
            .cycles(&["2024-12-19T18:00:00", "2024-12-20T06:00:00"])
            .leadtimes(&["0", "6"])
            .variable("REFC", "refc")
            .build(),
    )
}

fn runner_for(fx: &Fixture) -> FakeRunner {
    FakeRunner::new(fx.fs.clone(), fx.layout.clone())
}

fn table(runner: &FakeRunner) -> Arc<RunnerTable> {
    Arc::new(RunnerTable::uniform(Arc::new(runner.clone())))
}

async fn run_goal(fx: &Fixture, goal: Goal, runner: &FakeRunner, k: usize) -> ExecutionReport {
    let goals = fx.graph.goal_nodes(goal);
    let oracle = fx.oracle();
    with_timeout(execute(&fx.graph, &goals, &oracle, table(runner), k))
        .await
        .expect("execute")
}

#[tokio::test]
async fn stats_goal_runs_all_twelve_nodes_in_dependency_order() {
    init_tracing();
    let fx = two_by_two();
    let runner = runner_for(&fx);

    let report = run_goal(&fx, Goal::ComputeStats, &runner, 4).await;

    assert_eq!(report.nodes.len(), 12);
    assert_eq!(report.count(NodeStatus::Succeeded), 12);
    assert_eq!(report.exit_code(), 0);
    // The fake runner refuses to start before its inputs exist, so every
    // invocation having succeeded proves the ordering.
    assert_eq!(runner.invocation_count(), 12);

    let calls = runner.invocations();
    let pos = |id: &TaskId| calls.iter().position(|x| x == id).unwrap();
    for id in fx.graph.nodes_of_kind(TaskKind::ComputeStats) {
        for dep in fx.graph.dependencies_of(&id) {
            assert!(pos(dep) < pos(&id));
        }
    }
}

#[tokio::test]
async fn second_run_invokes_nothing() {
    init_tracing();
    let fx = two_by_two();

    let first = runner_for(&fx);
    let report = run_goal(&fx, Goal::MakePlots, &first, 2).await;
    assert_eq!(report.count(NodeStatus::Succeeded), 14);

    let second = runner_for(&fx);
    let report = run_goal(&fx, Goal::MakePlots, &second, 2).await;

    assert_eq!(second.invocation_count(), 0);
    assert_eq!(report.nodes.len(), 2, "only the satisfied goals are planned");
    assert!(report.nodes.values().all(|n| n.status == NodeStatus::Satisfied));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn prestaged_grids_are_not_rerun() {
    init_tracing();
    let fx = two_by_two();
    for id in fx.graph.nodes_of_kind(TaskKind::StageBaselineGrid) {
        fx.prestage(&id);
    }
    let runner = runner_for(&fx);

    let report = run_goal(&fx, Goal::ComputeStats, &runner, 4).await;

    assert_eq!(report.count(NodeStatus::Satisfied), 4);
    assert_eq!(report.count(NodeStatus::Succeeded), 8);
    assert!(
        runner
            .invocations()
            .iter()
            .all(|id| id.kind() != TaskKind::StageBaselineGrid)
    );
}

#[tokio::test]
async fn failed_grid_skips_only_its_own_downstream() {
    init_tracing();
    let fx = Fixture::new(
        ConfigFileBuilder::new()
            .cycles(&["2024-12-19T18:00:00", "2024-12-20T06:00:00"])
            .variable("REFC", "refc")
            .build(),
    );
    let broken = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "0"));
    let runner = runner_for(&fx);
    runner.fail_on(broken.clone());

    let report = run_goal(&fx, Goal::MakePlots, &runner, 2).await;

    assert_eq!(report.status_of(&broken), Some(NodeStatus::Failed));
    let err = report.nodes[&broken].error.as_ref().unwrap();
    assert_eq!(err.kind, RunnerErrorKind::Exit(1));

    let broken_cycle = broken.cycle();
    for (id, node) in &report.nodes {
        if *id == broken {
            continue;
        }
        let downstream = id.cycle() == broken_cycle
            && matches!(id.kind(), TaskKind::ComputeStats | TaskKind::MakePlot);
        if downstream {
            assert_eq!(node.status, NodeStatus::Skipped, "{id}");
            assert_eq!(node.blocked_by.as_ref(), Some(&broken));
        } else {
            assert_eq!(node.status, NodeStatus::Succeeded, "{id}");
        }
    }

    assert_eq!(report.count(NodeStatus::Skipped), 2);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn failed_runner_does_not_leave_an_artifact() {
    init_tracing();
    let fx = two_by_two();
    let runner = runner_for(&fx);
    runner.fail_kind(TaskKind::StageForecastGrid);

    let report = run_goal(&fx, Goal::StageBoth, &runner, 3).await;

    assert_eq!(report.count(NodeStatus::Failed), 4);
    assert_eq!(report.count(NodeStatus::Succeeded), 4);
    for id in fx.graph.nodes_of_kind(TaskKind::StageForecastGrid) {
        assert!(!fx.fs.contains(fx.layout.path_for(&id)));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn running_tasks_never_exceed_the_limit() {
    init_tracing();
    let fx = Fixture::new(
        ConfigFileBuilder::new()
            .cycle_range("2024-12-19T00:00:00", "6", "2024-12-20T00:00:00")
            .leadtime_range("0", "6", "24")
            .isobaric("HGT", "gh", &[500.0, 850.0])
            .build(),
    );
    let runner = FakeRunner::with_delay(fx.fs.clone(), fx.layout.clone(), Duration::from_millis(5));

    let report = run_goal(&fx, Goal::MakePlots, &runner, 3).await;

    assert_eq!(report.count(NodeStatus::Succeeded), fx.graph.len());
    assert!(runner.peak_concurrency() <= 3, "peak {}", runner.peak_concurrency());
}

#[tokio::test]
async fn forecast_goal_runs_only_forecast_grids() {
    init_tracing();
    let fx = Fixture::new(ConfigFileBuilder::new().variable("REFC", "refc").build());
    let runner = runner_for(&fx);

    let report = run_goal(&fx, Goal::StageForecast, &runner, 4).await;

    assert_eq!(runner.invocation_count(), 1);
    assert_eq!(runner.invocations()[0].kind(), TaskKind::StageForecastGrid);
    assert_eq!(report.nodes.len(), 1);
}

#[tokio::test]
async fn panicking_runner_fails_only_its_node() {
    init_tracing();
    let fx = Fixture::new(ConfigFileBuilder::new().variable("REFC", "refc").build());
    let forecast = TaskId::ForecastGrid(grid_key("2024-12-19T18:00:00", "0"));
    let baseline = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "0"));
    let runner = runner_for(&fx);
    runner.panic_on(forecast.clone());

    let report = run_goal(&fx, Goal::ComputeStats, &runner, 2).await;

    let failed = &report.nodes[&forecast];
    assert_eq!(failed.status, NodeStatus::Failed);
    let err = failed.error.as_ref().unwrap();
    assert_eq!(err.kind, RunnerErrorKind::Panicked);
    assert!(err.message.contains("injected panic"));

    assert_eq!(report.status_of(&baseline), Some(NodeStatus::Succeeded));
    assert_eq!(report.count(NodeStatus::Skipped), 1);
}

#[tokio::test]
async fn kind_without_runner_fails_as_unavailable() {
    init_tracing();
    let fx = Fixture::new(ConfigFileBuilder::new().variable("REFC", "refc").build());
    let runner = runner_for(&fx);
    let grids_only = RunnerTable::new()
        .with(TaskKind::StageBaselineGrid, Arc::new(runner.clone()))
        .with(TaskKind::StageForecastGrid, Arc::new(runner.clone()));
    assert_eq!(
        grids_only.missing(),
        vec![TaskKind::ComputeStats, TaskKind::MakePlot]
    );

    let goals = fx.graph.goal_nodes(Goal::ComputeStats);
    let oracle = fx.oracle();
    let report = with_timeout(execute(&fx.graph, &goals, &oracle, Arc::new(grids_only), 2))
        .await
        .unwrap();

    let stats = &report.nodes[&goals[0]];
    assert_eq!(stats.status, NodeStatus::Failed);
    assert_eq!(
        stats.error.as_ref().map(|e| e.kind),
        Some(RunnerErrorKind::Unavailable)
    );
    assert_eq!(report.count(NodeStatus::Succeeded), 2);
}

#[tokio::test]
async fn shutdown_cancels_everything_not_yet_started() {
    init_tracing();
    let fx = two_by_two();
    let runner = runner_for(&fx);
    let goals = fx.graph.goal_nodes(Goal::ComputeStats);
    let oracle = fx.oracle();
    let plan = Plan::compute(&fx.graph, &goals, &oracle).unwrap();

    let runtime = Runtime::new(&fx.graph, plan, table(&runner), 1);
    runtime
        .event_sender()
        .send(RuntimeEvent::ShutdownRequested)
        .await
        .unwrap();

    let report = with_timeout(runtime.run()).await.unwrap();

    // The first dispatched task finishes; the other eleven never start.
    assert_eq!(runner.invocation_count(), 1);
    assert_eq!(report.count(NodeStatus::Succeeded), 1);
    assert_eq!(report.count(NodeStatus::Cancelled), 11);
    assert!(report.was_cancelled());
    assert_eq!(report.exit_code(), 1);
}
