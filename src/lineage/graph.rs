//! Lineage graph over canonical entity keys.
//!
//! Nodes are [`EntityRef`]s and exist only because some edge references them.
//! Parallel edges between the same pair are kept when their dependency kind or
//! transformation differ; identical edges collapse on insertion.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::model::{EdgeData, EntityRef, LineageEdge};

/// Serializable edge-list form of a lineage graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedLineage {
    pub edges: Vec<LineageEdge>,
}

/// Directed lineage multigraph.
#[derive(Debug, Clone, Default)]
pub struct LineageGraph {
    pub(super) graph: DiGraph<EntityRef, EdgeData>,
    pub(super) node_index: HashMap<EntityRef, NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an edge list, collapsing duplicates.
    pub fn from_edges<I: IntoIterator<Item = LineageEdge>>(edges: I) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(edge);
        }
        graph
    }

    fn get_or_create_node(&mut self, entity: EntityRef) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&entity) {
            idx
        } else {
            let idx = self.graph.add_node(entity.clone());
            self.node_index.insert(entity, idx);
            idx
        }
    }

    /// Insert an edge. Returns `false` when an identical edge already exists.
    pub fn add_edge(&mut self, edge: LineageEdge) -> bool {
        let LineageEdge {
            source,
            target,
            dependency_type,
            transformation,
        } = edge;
        let data = EdgeData {
            dependency_type,
            transformation,
        };

        let from_idx = self.get_or_create_node(source);
        let to_idx = self.get_or_create_node(target);

        let edge_exists = self
            .graph
            .edges_connecting(from_idx, to_idx)
            .any(|e| *e.weight() == data);

        if edge_exists {
            false
        } else {
            self.graph.add_edge(from_idx, to_idx, data);
            true
        }
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.node_index.contains_key(entity)
    }

    pub(super) fn index_of(&self, entity: &EntityRef) -> Option<NodeIndex> {
        self.node_index.get(entity).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Every node, sorted by key.
    pub fn nodes(&self) -> Vec<&EntityRef> {
        let mut nodes: Vec<&EntityRef> = self.graph.node_weights().collect();
        nodes.sort();
        nodes
    }

    /// The flat edge list, sorted.
    pub fn edges(&self) -> Vec<LineageEdge> {
        let mut edges: Vec<LineageEdge> = self
            .graph
            .edge_references()
            .filter_map(|edge_ref| {
                let source = self.graph.node_weight(edge_ref.source())?.clone();
                let target = self.graph.node_weight(edge_ref.target())?.clone();
                let data = edge_ref.weight();
                Some(LineageEdge::new(
                    source,
                    target,
                    data.dependency_type,
                    data.transformation.clone(),
                ))
            })
            .collect();
        edges.sort();
        edges
    }

    /// Nodes with no incoming edges.
    pub fn roots(&self) -> Vec<&EntityRef> {
        let mut roots: Vec<&EntityRef> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .neighbors_directed(idx, petgraph::Direction::Incoming)
                    .next()
                    .is_none()
            })
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect();
        roots.sort();
        roots
    }

    /// Strongly connected groups that form reference cycles, each sorted.
    pub fn cycles(&self) -> Vec<Vec<EntityRef>> {
        let mut cycles: Vec<Vec<EntityRef>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                // A single node is only a cycle if it has a self-loop
                if scc.len() == 1 {
                    let idx = scc[0];
                    self.graph.edges_connecting(idx, idx).next().is_some()
                } else {
                    true
                }
            })
            .map(|scc| {
                let mut members: Vec<EntityRef> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn to_serializable(&self) -> SerializedLineage {
        SerializedLineage {
            edges: self.edges(),
        }
    }

    pub fn from_serializable(serialized: SerializedLineage) -> Self {
        Self::from_edges(serialized.edges)
    }
}
