//! The lineage graph and impact queries over it.
//!
//! - [`graph`]: petgraph-backed multigraph keyed by [`EntityRef`](crate::model::EntityRef)
//! - [`builder`]: merges extractor edge lists, collapsing duplicates
//! - [`impact`]: ancestors, descendants, impact subgraph, levelled flow rows

pub mod builder;
pub mod error;
pub mod graph;
pub mod impact;

pub use builder::LineageBuilder;
pub use error::{LineageError, LineageResult};
pub use graph::{LineageGraph, SerializedLineage};
pub use impact::{format_flow_rows, FlowRow, ImpactAnalysis, ImpactSummary};
