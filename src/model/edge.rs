//! Typed lineage edges.

use serde::{Deserialize, Serialize};

use super::entity::EntityRef;

/// Classification of a lineage dependency.
///
/// The kind is decided by the extractor that discovers the edge and is never
/// re-derived afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    /// A column feeds a column or measure.
    #[serde(rename = "Column Reference")]
    ColumnReference,

    /// A measure feeds another measure or calculated column.
    #[serde(rename = "Measure Reference")]
    MeasureReference,

    /// A calculated column pulls a value across a relationship (RELATED lookup).
    #[serde(rename = "RELATED Relationship")]
    RelatedRelationship,

    /// A declared relationship between two model tables.
    #[serde(rename = "Model Relationship")]
    ModelRelationship,

    /// A warehouse table sources a model table.
    #[serde(rename = "Source Mapping")]
    SourceMapping,
}

impl DependencyKind {
    /// Human-readable label used in edge-list exports.
    pub fn label(&self) -> &'static str {
        match self {
            DependencyKind::ColumnReference => "Column Reference",
            DependencyKind::MeasureReference => "Measure Reference",
            DependencyKind::RelatedRelationship => "RELATED Relationship",
            DependencyKind::ModelRelationship => "Model Relationship",
            DependencyKind::SourceMapping => "Source Mapping",
        }
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Weight stored on a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeData {
    pub dependency_type: DependencyKind,
    /// Original expression text; may be empty.
    pub transformation: String,
}

/// One row of the flat edge list: `Source, Target, DependencyType, Transformation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineageEdge {
    pub source: EntityRef,
    pub target: EntityRef,
    pub dependency_type: DependencyKind,
    pub transformation: String,
}

impl LineageEdge {
    pub fn new(
        source: EntityRef,
        target: EntityRef,
        dependency_type: DependencyKind,
        transformation: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            dependency_type,
            transformation: transformation.into(),
        }
    }

    /// Both endpoints carry a non-empty key.
    pub fn is_valid(&self) -> bool {
        !self.source.is_empty() && !self.target.is_empty()
    }

    pub fn data(&self) -> EdgeData {
        EdgeData {
            dependency_type: self.dependency_type,
            transformation: self.transformation.clone(),
        }
    }
}
