// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::node::{GridKey, PlotKey, Source, TaskId, TaskKind, TaskNode};
use crate::errors::{Result, VxError};
use crate::params::VerificationPoint;
use crate::types::Goal;

/// Optional capabilities that change the shape of the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphFlags {
    /// Plots also depend directly on the baseline grids they display.
    pub baseline_plots: bool,
    /// Every point also gets baseline statistics, which its plot displays.
    pub baseline_compare: bool,
}

impl GraphFlags {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            baseline_plots: cfg.baseline.plot,
            baseline_compare: cfg.baseline.compare,
        }
    }
}

/// In-memory DAG of task nodes keyed by [`TaskId`].
///
/// Built once per invocation from the verification points; never persisted.
/// Edges always point from a later stage to an earlier one, so the graph is
/// acyclic by construction; [`TaskGraph::validate`] double-checks with a
/// topological sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskId, TaskNode>,
}

impl TaskGraph {
    /// Build the graph for the given points.
    ///
    /// Per point: both grid nodes (shared per cycle/leadtime), the stats node
    /// depending on them, and the plot node (shared per cycle/variable/level)
    /// depending on the stats node and, with `baseline_plots`, on the
    /// baseline grid.
    ///
    /// With `baseline_compare`, each point also gets a baseline stats node
    /// over its baseline grid and the baseline analysis grid at its valid
    /// time; the plot depends on it as well.
    pub fn build(points: &[VerificationPoint], flags: GraphFlags) -> Result<Self> {
        let mut graph = TaskGraph::default();

        for point in points {
            let grid = GridKey::of(point);
            let baseline = graph.ensure_node(TaskId::BaselineGrid(grid));
            let forecast = graph.ensure_node(TaskId::ForecastGrid(grid));

            let stats = graph.ensure_node(TaskId::Stats(Source::Forecast, point.clone()));
            graph.add_edge(&stats, &baseline)?;
            graph.add_edge(&stats, &forecast)?;

            let plot = graph.ensure_node(TaskId::Plot(PlotKey::of(point)));
            graph.add_edge(&plot, &stats)?;
            if flags.baseline_plots {
                graph.add_edge(&plot, &baseline)?;
            }

            if flags.baseline_compare {
                let analysis =
                    graph.ensure_node(TaskId::BaselineGrid(GridKey::analysis_of(point)));
                let compared = graph.ensure_node(TaskId::Stats(Source::Baseline, point.clone()));
                graph.add_edge(&compared, &baseline)?;
                graph.add_edge(&compared, &analysis)?;
                graph.add_edge(&plot, &compared)?;
            }
        }

        graph.validate()?;

        debug!(
            points = points.len(),
            nodes = graph.len(),
            edges = graph.edge_count(),
            baseline_plots = flags.baseline_plots,
            baseline_compare = flags.baseline_compare,
            "built task graph"
        );

        Ok(graph)
    }

    /// Insert `id` unless an equal node already exists; returns the id.
    fn ensure_node(&mut self, id: TaskId) -> TaskId {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| TaskNode::new(id.clone()));
        id
    }

    /// Record that `task` depends on `dep`. Both nodes must already exist.
    fn add_edge(&mut self, task: &TaskId, dep: &TaskId) -> Result<()> {
        if task == dep {
            return Err(VxError::GraphConstruction(format!(
                "task {task} cannot depend on itself"
            )));
        }
        if stage_rank(dep.kind()) >= stage_rank(task.kind()) {
            return Err(VxError::GraphConstruction(format!(
                "task {task} cannot depend on {dep} (stage order)"
            )));
        }
        if !self.nodes.contains_key(dep) {
            return Err(VxError::GraphConstruction(format!(
                "task {task} depends on unknown task {dep}"
            )));
        }

        match self.nodes.get_mut(task) {
            Some(node) => {
                node.deps.insert(dep.clone());
            }
            None => {
                return Err(VxError::GraphConstruction(format!(
                    "dependency declared for unknown task {task}"
                )));
            }
        }
        if let Some(dep_node) = self.nodes.get_mut(dep) {
            dep_node.dependents.insert(task.clone());
        }
        Ok(())
    }

    /// Check acyclicity with a topological sort over the whole graph.
    pub fn validate(&self) -> Result<()> {
        let all: BTreeSet<TaskId> = self.nodes.keys().cloned().collect();
        self.topological_order(&all).map(|_| ())
    }

    /// Topological order (dependencies first) of the given subset of nodes.
    ///
    /// Only edges between members of `subset` are considered. Ties are
    /// broken deterministically by the subset's iteration order.
    pub fn topological_order(&self, subset: &BTreeSet<TaskId>) -> Result<Vec<TaskId>> {
        // Edge direction: dep -> task, so the sort yields dependencies first.
        let mut graph: DiGraph<&TaskId, ()> = DiGraph::new();
        let mut index: HashMap<&TaskId, NodeIndex> = HashMap::new();

        for id in subset {
            index.insert(id, graph.add_node(id));
        }
        for id in subset {
            for dep in self.dependencies_of(id) {
                if let (Some(&from), Some(&to)) = (index.get(dep), index.get(id)) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(|ix| graph[ix].clone()).collect()),
            Err(cycle) => Err(VxError::GraphConstruction(format!(
                "cycle detected in task graph involving {}",
                graph[cycle.node_id()]
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.deps.len()).sum()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &TaskId) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// Immediate dependencies of a node (empty for unknown ids).
    pub fn dependencies_of<'a>(
        &'a self,
        id: &TaskId,
    ) -> impl Iterator<Item = &'a TaskId> + use<'a> {
        self.nodes.get(id).into_iter().flat_map(|n| n.deps.iter())
    }

    /// Immediate dependents of a node (empty for unknown ids).
    pub fn dependents_of<'a>(
        &'a self,
        id: &TaskId,
    ) -> impl Iterator<Item = &'a TaskId> + use<'a> {
        self.nodes.get(id).into_iter().flat_map(|n| n.dependents.iter())
    }

    pub fn nodes_of_kind(&self, kind: TaskKind) -> Vec<TaskId> {
        self.nodes
            .keys()
            .filter(|id| id.kind() == kind)
            .cloned()
            .collect()
    }

    /// Terminal nodes of a goal.
    pub fn goal_nodes(&self, goal: Goal) -> Vec<TaskId> {
        goal.kinds()
            .iter()
            .flat_map(|kind| self.nodes_of_kind(*kind))
            .collect()
    }

    /// Resolve a goal by name; unknown names are a graph construction error.
    pub fn resolve_goal(&self, name: &str) -> Result<Vec<TaskId>> {
        let goal: Goal = name.parse()?;
        Ok(self.goal_nodes(goal))
    }
}

/// Position of a kind in the fixed stage order; edges must point to a
/// strictly lower rank.
fn stage_rank(kind: TaskKind) -> u8 {
    match kind {
        TaskKind::StageBaselineGrid | TaskKind::StageForecastGrid => 0,
        TaskKind::ComputeStats => 1,
        TaskKind::MakePlot => 2,
    }
}
