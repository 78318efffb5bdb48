//! Core lineage types shared by every extractor.
//!
//! - [`EntityRef`]: canonical key for a table, column or measure
//! - [`LineageEdge`] / [`DependencyKind`]: one typed dependency between two entities
//! - [`SqlObject`] / [`SemanticMetadata`]: the materialized inputs handed to the extractors

pub mod edge;
pub mod entity;
pub mod input;

pub use edge::{DependencyKind, EdgeData, LineageEdge};
pub use entity::EntityRef;
pub use input::{
    load_sql_objects, ColumnRow, InputError, InputResult, MeasureRow, ObjectKind, PartitionRow,
    RelationshipRow, SemanticMetadata, SqlObject, TableRow,
};
