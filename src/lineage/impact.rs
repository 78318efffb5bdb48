//! Impact analysis: closures, the impact subgraph and levelled flow rows.
//!
//! Every traversal is breadth-first with a visited set, so cycles terminate
//! and the selected node never appears in its own closure.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use crate::model::{DependencyKind, EntityRef};

use super::error::{LineageError, LineageResult};
use super::graph::LineageGraph;

/// One edge of an impact subgraph, labelled with its distance from the
/// selected node: negative upstream, positive downstream, 0 at the node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowRow {
    pub level: i64,
    pub source: EntityRef,
    pub target: EntityRef,
    pub dependency_type: DependencyKind,
    pub transformation: String,
}

/// Headline counts for one impact query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImpactSummary {
    pub upstream: usize,
    pub downstream: usize,
    /// Selected node plus both closures.
    pub total_impact: usize,
    /// Edges in the impact subgraph.
    pub total_dependencies: usize,
}

/// Result of an impact query. Never shares state with the base graph.
#[derive(Debug, Clone)]
pub struct ImpactAnalysis {
    pub selected: EntityRef,
    pub upstream: BTreeSet<EntityRef>,
    pub downstream: BTreeSet<EntityRef>,
    pub subgraph: LineageGraph,
    pub flow: Vec<FlowRow>,
}

impl ImpactAnalysis {
    pub fn summary(&self) -> ImpactSummary {
        let mut impact: BTreeSet<&EntityRef> = self.upstream.iter().collect();
        impact.extend(self.downstream.iter());
        impact.insert(&self.selected);
        ImpactSummary {
            upstream: self.upstream.len(),
            downstream: self.downstream.len(),
            total_impact: impact.len(),
            total_dependencies: self.flow.len(),
        }
    }
}

impl LineageGraph {
    fn require(&self, node: &EntityRef) -> LineageResult<NodeIndex> {
        self.index_of(node)
            .ok_or_else(|| LineageError::NodeNotFound(node.to_string()))
    }

    fn reachable(&self, start: NodeIndex, direction: Direction) -> HashSet<NodeIndex> {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(idx) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(idx, direction) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited.remove(&start);
        visited
    }

    fn entities(&self, indices: HashSet<NodeIndex>) -> BTreeSet<EntityRef> {
        indices
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }

    /// Every node `node` transitively depends on, excluding `node`.
    pub fn ancestors(&self, node: &EntityRef) -> LineageResult<BTreeSet<EntityRef>> {
        let start = self.require(node)?;
        Ok(self.entities(self.reachable(start, Direction::Incoming)))
    }

    /// Every node transitively depending on `node`, excluding `node`.
    pub fn descendants(&self, node: &EntityRef) -> LineageResult<BTreeSet<EntityRef>> {
        let start = self.require(node)?;
        Ok(self.entities(self.reachable(start, Direction::Outgoing)))
    }

    /// Induced subgraph over `node`, its ancestors and its descendants.
    pub fn impact_subgraph(&self, node: &EntityRef) -> LineageResult<LineageGraph> {
        let start = self.require(node)?;
        let mut keep = self.reachable(start, Direction::Incoming);
        keep.extend(self.reachable(start, Direction::Outgoing));
        keep.insert(start);

        let graph = self.graph.filter_map(
            |idx, entity| keep.contains(&idx).then(|| entity.clone()),
            |_, data| Some(data.clone()),
        );
        let node_index = graph
            .node_indices()
            .filter_map(|idx| graph.node_weight(idx).map(|entity| (entity.clone(), idx)))
            .collect();

        Ok(LineageGraph { graph, node_index })
    }

    fn bfs_levels(
        &self,
        start: NodeIndex,
        direction: Direction,
        step: i64,
    ) -> HashMap<NodeIndex, i64> {
        let mut levels = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([(start, 0)]);

        while let Some((idx, level)) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(idx, direction) {
                if !levels.contains_key(&neighbor) {
                    levels.insert(neighbor, level + step);
                    queue.push_back((neighbor, level + step));
                }
            }
        }
        levels
    }

    /// Levelled flow rows of this graph around `node`.
    ///
    /// Each edge takes the level of its source: the upstream distance if the
    /// source is an ancestor (or `node` itself), else the downstream distance,
    /// else 0. Rows are sorted by level, then source.
    pub fn levels(&self, node: &EntityRef) -> LineageResult<Vec<FlowRow>> {
        let start = self.require(node)?;
        let upstream = self.bfs_levels(start, Direction::Incoming, -1);
        let downstream = self.bfs_levels(start, Direction::Outgoing, 1);

        let mut rows: Vec<FlowRow> = self
            .graph
            .edge_references()
            .filter_map(|edge_ref| {
                let source_idx = edge_ref.source();
                let level = upstream
                    .get(&source_idx)
                    .or_else(|| downstream.get(&source_idx))
                    .copied()
                    .unwrap_or(0);
                let data = edge_ref.weight();
                Some(FlowRow {
                    level,
                    source: self.graph.node_weight(source_idx)?.clone(),
                    target: self.graph.node_weight(edge_ref.target())?.clone(),
                    dependency_type: data.dependency_type,
                    transformation: data.transformation.clone(),
                })
            })
            .collect();
        rows.sort();
        Ok(rows)
    }

    /// Closures, impact subgraph and flow rows for `node`.
    pub fn impact(&self, node: &EntityRef) -> LineageResult<ImpactAnalysis> {
        let upstream = self.ancestors(node)?;
        let downstream = self.descendants(node)?;
        let subgraph = self.impact_subgraph(node)?;
        let flow = subgraph.levels(node)?;

        tracing::debug!(
            node = %node,
            upstream = upstream.len(),
            downstream = downstream.len(),
            dependencies = flow.len(),
            "impact analysis"
        );

        Ok(ImpactAnalysis {
            selected: node.clone(),
            upstream,
            downstream,
            subgraph,
            flow,
        })
    }
}

/// Tab-separated flow table with a header row. Whitespace runs inside
/// transformations collapse to one space.
pub fn format_flow_rows(rows: &[FlowRow]) -> String {
    let mut out = String::from("Level\tSource\tTarget\tDependencyType\tTransformation\n");
    for row in rows {
        let transformation = row
            .transformation
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            row.level, row.source, row.target, row.dependency_type, transformation
        );
    }
    out
}
