mod common;

use std::path::PathBuf;

use common::{Fixture, grid_key};
use vxflow::dag::{SatisfactionCheck, TaskId, TaskKind};
use vxflow::errors::VxError;
use vxflow::oracle::ValidityProbe;
use vxflow_test_utils::builders::ConfigFileBuilder;

fn fixture() -> Fixture {
    Fixture::new(
        ConfigFileBuilder::new()
            .leadtimes(&["0", "6"])
            .isobaric("HGT", "gh", &[500.0, 900.0])
            .build(),
    )
}

#[test]
fn artifact_paths_follow_the_layout() {
    let fx = fixture();
    let grid = grid_key("2024-12-19T18:00:00", "6");

    assert_eq!(
        fx.layout.path_for(&TaskId::BaselineGrid(grid)),
        PathBuf::from("/data/grids/baseline/20241219/18/006/baseline.grib2")
    );
    assert_eq!(
        fx.layout.path_for(&TaskId::ForecastGrid(grid)),
        PathBuf::from("/data/grids/forecast/20241219/18/006/forecast.nc")
    );

    let plot = fx
        .graph
        .nodes_of_kind(TaskKind::MakePlot)
        .into_iter()
        .find(|id| id.variable_label().as_deref() == Some("HGT-0900"))
        .unwrap();
    assert_eq!(
        fx.layout.path_for(&plot),
        PathBuf::from("/data/run/plots/20241219/18/HGT-0900-plot.png")
    );
}

#[test]
fn present_artifact_satisfies_and_absent_does_not() {
    let fx = fixture();
    let grid = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "0"));
    let other = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "6"));
    fx.prestage(&grid);

    let oracle = fx.oracle();
    assert!(oracle.is_satisfied(&grid));
    assert!(!oracle.is_satisfied(&other));
}

#[test]
fn repeated_checks_hit_storage_once_per_path() {
    let fx = fixture();
    let grid = TaskId::ForecastGrid(grid_key("2024-12-19T18:00:00", "0"));
    let oracle = fx.oracle();

    for _ in 0..5 {
        assert!(!oracle.is_satisfied(&grid));
    }
    assert_eq!(fx.fs.probes(), 1);
}

#[test]
fn cached_answer_is_kept_for_the_invocation() {
    let fx = fixture();
    let grid = TaskId::ForecastGrid(grid_key("2024-12-19T18:00:00", "0"));
    let oracle = fx.oracle();

    assert!(!oracle.is_satisfied(&grid));
    fx.prestage(&grid);
    assert!(!oracle.is_satisfied(&grid));

    // A new invocation sees the new artifact.
    assert!(fx.oracle().is_satisfied(&grid));
}

#[test]
fn empty_artifact_is_not_valid_by_default() {
    let fx = fixture();
    let grid = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "0"));
    fx.fs.add_file(fx.layout.path_for(&grid), Vec::new());

    assert!(!fx.oracle().is_satisfied(&grid));
    assert!(fx.oracle().with_probe(ValidityProbe::Exists).is_satisfied(&grid));
}

#[test]
fn unreachable_store_counts_as_not_satisfied() {
    let fx = fixture();
    let grid = TaskId::BaselineGrid(grid_key("2024-12-19T18:00:00", "0"));
    fx.prestage(&grid);
    fx.fs.set_unreachable("/data/grids/baseline");

    let oracle = fx.oracle();
    let err = oracle.check(&grid).unwrap_err();
    assert!(matches!(err, VxError::Oracle { .. }));
    assert!(!oracle.is_satisfied(&grid));

    // Failures are not cached.
    assert_eq!(fx.fs.probes(), 2);
}

#[test]
fn oracle_works_as_a_satisfaction_check() {
    let fx = fixture();
    let stats = fx.graph.nodes_of_kind(TaskKind::ComputeStats);
    fx.prestage(&stats[0]);

    let oracle = fx.oracle();
    let check: &dyn SatisfactionCheck = &oracle;
    assert!(check.is_satisfied(&stats[0]));
    assert!(!check.is_satisfied(&stats[1]));
}
