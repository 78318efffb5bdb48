//! Errors raised by lineage graph queries.

/// Result type for lineage graph queries.
pub type LineageResult<T> = Result<T, LineageError>;

/// Error type for lineage graph queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// The queried node is not in the graph.
    #[error("Node not found in lineage graph: {0}")]
    NodeNotFound(String),
}
