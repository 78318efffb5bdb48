//! Input records supplied by the warehouse catalog and the semantic-model server.
//!
//! Fetching these rows is the caller's job; this module only defines their shape
//! and loads them from JSON exports.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors raised while loading input files.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Failed to read input file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse input file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type InputResult<T> = Result<T, InputError>;

// =============================================================================
// SQL Objects
// =============================================================================

/// Kind of warehouse object, as reported by `sys.objects.type_desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    #[serde(rename = "TABLE", alias = "USER_TABLE")]
    Table,
    #[serde(rename = "VIEW")]
    View,
    #[serde(rename = "SQL_STORED_PROCEDURE")]
    StoredProcedure,
}

impl ObjectKind {
    pub fn type_desc(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::StoredProcedure => "SQL_STORED_PROCEDURE",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_desc())
    }
}

/// A view, procedure or table definition from the warehouse catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlObject {
    #[serde(rename = "schema_name")]
    pub schema: String,
    #[serde(rename = "object_name")]
    pub name: String,
    #[serde(rename = "type_desc")]
    pub kind: ObjectKind,
    /// Module text; tables carry none.
    #[serde(default)]
    pub definition: Option<String>,
}

impl SqlObject {
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: ObjectKind,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            definition: Some(definition.into()),
        }
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Load a JSON array of SQL object rows.
pub fn load_sql_objects<P: AsRef<Path>>(path: P) -> InputResult<Vec<SqlObject>> {
    read_json(path.as_ref())
}

// =============================================================================
// Semantic Model Metadata
// =============================================================================

/// Row of the Tables metadata set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Name", alias = "ExplicitName")]
    pub name: String,
}

/// Row of the Columns metadata set. Calculated columns carry an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRow {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "TableID")]
    pub table_id: u64,
    #[serde(rename = "Name", alias = "ExplicitName")]
    pub name: String,
    #[serde(rename = "Expression", default)]
    pub expression: Option<String>,
}

/// Row of the Measures metadata set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRow {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "TableID")]
    pub table_id: u64,
    #[serde(rename = "Name", alias = "ExplicitName")]
    pub name: String,
    #[serde(rename = "Expression", default)]
    pub expression: Option<String>,
}

/// Row of the Partitions metadata set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionRow {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "TableID", default)]
    pub table_id: u64,
    /// Owning table name when the row carries it directly.
    #[serde(rename = "TableName", default)]
    pub table_name: Option<String>,
    #[serde(rename = "Expression", default)]
    pub expression: Option<String>,
    #[serde(rename = "QueryDefinition", default)]
    pub query_definition: Option<String>,
}

impl PartitionRow {
    /// The mashup text: `Expression` when non-empty, else `QueryDefinition`.
    pub fn mashup_text(&self) -> Option<&str> {
        self.expression
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.query_definition.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Owning table: `TableName` if present, else looked up by `TableID`.
    pub fn owner<'a>(&'a self, tables: &HashMap<u64, &'a str>) -> Option<&'a str> {
        self.table_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| tables.get(&self.table_id).copied())
    }
}

/// Row of the Relationships metadata set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRow {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "FromTableID")]
    pub from_table_id: u64,
    #[serde(rename = "ToTableID")]
    pub to_table_id: u64,
}

/// The five metadata row sets of a tabular semantic model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticMetadata {
    #[serde(rename = "Tables")]
    pub tables: Vec<TableRow>,
    #[serde(rename = "Columns")]
    pub columns: Vec<ColumnRow>,
    #[serde(rename = "Measures")]
    pub measures: Vec<MeasureRow>,
    #[serde(rename = "Partitions")]
    pub partitions: Vec<PartitionRow>,
    #[serde(rename = "Relationships")]
    pub relationships: Vec<RelationshipRow>,
}

impl SemanticMetadata {
    /// Load from a JSON object with `Tables`, `Columns`, `Measures`,
    /// `Partitions` and `Relationships` arrays.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> InputResult<Self> {
        read_json(path.as_ref())
    }

    /// Table ID → table name.
    pub fn table_names(&self) -> HashMap<u64, &str> {
        self.tables
            .iter()
            .map(|t| (t.id, t.name.as_str()))
            .collect()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> InputResult<T> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| InputError::Json {
        path: path.to_path_buf(),
        source,
    })
}
