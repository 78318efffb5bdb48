//! Merges extractor outputs into one [`LineageGraph`].

use crate::model::LineageEdge;

use super::graph::LineageGraph;

/// Accumulates edges from any number of extractors.
///
/// Edges with an empty endpoint are dropped; identical edges collapse.
#[derive(Debug, Default)]
pub struct LineageBuilder {
    graph: LineageGraph,
    received: usize,
    dropped: usize,
}

impl LineageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of edges. Returns how many were new to the graph.
    pub fn extend<I: IntoIterator<Item = LineageEdge>>(&mut self, edges: I) -> usize {
        let mut inserted = 0;
        for edge in edges {
            self.received += 1;
            if !edge.is_valid() {
                tracing::debug!(
                    source = %edge.source,
                    target = %edge.target,
                    "dropping edge with empty endpoint"
                );
                self.dropped += 1;
                continue;
            }
            if self.graph.add_edge(edge) {
                inserted += 1;
            }
        }
        inserted
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn finish(self) -> LineageGraph {
        tracing::debug!(
            received = self.received,
            dropped = self.dropped,
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "lineage graph built"
        );
        self.graph
    }
}
