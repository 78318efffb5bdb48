//! # lineage-lens
//!
//! Column-level data lineage across warehouse SQL objects and a tabular
//! semantic model, assembled into one graph for impact analysis.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │  SQL objects (views, procs)  │   │   Semantic model metadata    │
//! │  CREATE VIEW / INSERT / MERGE│   │ measures, calc columns, M    │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!               │ [sql]                             │ [semantic]
//!               ▼                                   ▼
//!     alias map + column usage           formula refs + mashup sources
//!               │                                   │
//!               └───────────────┬───────────────────┘
//!                               ▼ [lineage::builder]
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │        LineageGraph (EntityRef nodes, typed multi-edges)            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼ [lineage::impact]
//!        ancestors / descendants / impact subgraph / levelled flow rows
//! ```
//!
//! [`pipeline::build_lineage`] runs the whole thing from loaded inputs.

pub mod config;
pub mod lineage;
pub mod model;
pub mod pipeline;
pub mod semantic;
pub mod sql;

pub use config::{Settings, SettingsError};
pub use lineage::{
    FlowRow, ImpactAnalysis, ImpactSummary, LineageBuilder, LineageError, LineageGraph,
    LineageResult,
};
pub use model::{DependencyKind, EntityRef, LineageEdge, ObjectKind, SemanticMetadata, SqlObject};
pub use pipeline::{build_lineage, BuildOptions, LineageBuild, LineageInputs, PipelineError};
pub use semantic::SemanticExtractor;
pub use sql::{find_column_usage, SqlLineageExtractor, SqlLineageRow};
