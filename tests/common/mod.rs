#![allow(dead_code)]

use std::sync::Arc;

use vxflow::config::ConfigFile;
use vxflow::dag::{GraphFlags, GridKey, TaskGraph, TaskId};
use vxflow::fs::FileSystem;
use vxflow::fs::mock::MockFileSystem;
use vxflow::oracle::{ArtifactLayout, ArtifactStateOracle};
use vxflow::params::expand_points;
use vxflow::params::time::{parse_cycle, parse_duration};

/// A built graph over an in-memory artifact store.
pub struct Fixture {
    pub cfg: ConfigFile,
    pub graph: TaskGraph,
    pub fs: MockFileSystem,
    pub layout: ArtifactLayout,
}

impl Fixture {
    pub fn new(cfg: ConfigFile) -> Self {
        let points = expand_points(&cfg).expect("expand points");
        let graph = TaskGraph::build(&points, GraphFlags::from_config(&cfg)).expect("build graph");
        let layout = ArtifactLayout::from_config(&cfg);
        Self {
            cfg,
            graph,
            fs: MockFileSystem::new(),
            layout,
        }
    }

    /// A fresh oracle (empty cache) over the fixture's store.
    pub fn oracle(&self) -> ArtifactStateOracle {
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        ArtifactStateOracle::new(fs, self.layout.clone())
    }

    /// Publish `id`'s artifact as if an earlier run produced it.
    pub fn prestage(&self, id: &TaskId) {
        self.fs.add_file(self.layout.path_for(id), "existing");
    }
}

pub fn grid_key(cycle: &str, leadtime: &str) -> GridKey {
    GridKey {
        cycle: parse_cycle(cycle).expect("cycle"),
        leadtime: parse_duration(leadtime).expect("leadtime"),
    }
}
