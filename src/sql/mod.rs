//! SQL lineage: views and stored procedures parsed with sqlparser-rs.
//!
//! - [`alias`]: table alias → qualified table name, per statement
//! - [`usage`]: column references in expressions, projection matching, column-usage search
//! - [`extract`]: SELECT / INSERT / MERGE dispatch producing lineage rows
//! - [`source`]: comment stripping and tolerant definition parsing

pub mod alias;
pub mod error;
pub mod extract;
pub mod source;
pub mod usage;

pub use alias::AliasMap;
pub use error::{SqlExtractError, SqlExtractResult};
pub use extract::{SkippedObject, SqlExtraction, SqlLineageExtractor, SqlLineageRow};
pub use source::{clean_sql, procedure_body};
pub use usage::{
    column_references, column_usage, find_column_usage, insert_target, match_projection,
    ColumnName, ColumnReferences, ColumnUsage, ColumnUsageRow, ProjectionLineage, SubqueryDepth,
};
