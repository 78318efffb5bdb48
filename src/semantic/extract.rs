//! Lineage edges from semantic-model metadata.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::{DependencyKind, EntityRef, LineageEdge, SemanticMetadata};

use super::formula::{Formula, MeasureIndex};
use super::mashup;

/// Default warehouse prefix on mashup source nodes.
pub const DEFAULT_SOURCE_PREFIX: &str = "SQL";
/// Default transformation text on source-mapping edges.
pub const DEFAULT_SOURCE_LABEL: &str = "Power Query Source";
/// Default transformation text on relationship edges.
pub const DEFAULT_RELATIONSHIP_LABEL: &str = "Model Relationship";

/// Extracts measure, calculated-column, relationship and source-mapping edges.
#[derive(Debug, Clone)]
pub struct SemanticExtractor {
    pub source_prefix: String,
    pub source_label: String,
    pub relationship_label: String,
}

impl Default for SemanticExtractor {
    fn default() -> Self {
        Self {
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            relationship_label: DEFAULT_RELATIONSHIP_LABEL.to_string(),
        }
    }
}

impl SemanticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every edge the metadata implies.
    ///
    /// Rows whose `TableID` has no matching table are skipped.
    pub fn extract(&self, metadata: &SemanticMetadata, parallel: bool) -> Vec<LineageEdge> {
        let tables = metadata.table_names();
        let index = measure_index(metadata, &tables);
        let formulas = formulas(metadata, &tables);

        let mut edges: Vec<LineageEdge> = if parallel {
            formulas
                .par_iter()
                .flat_map_iter(|formula| formula.edges(&index))
                .collect()
        } else {
            formulas
                .iter()
                .flat_map(|formula| formula.edges(&index))
                .collect()
        };
        let formula_edges = edges.len();

        edges.extend(self.relationship_edges(metadata, &tables));
        edges.extend(self.source_edges(metadata, &tables));

        tracing::debug!(
            formulas = formulas.len(),
            measures_indexed = index.len(),
            formula_edges,
            total = edges.len(),
            "semantic extraction"
        );
        edges
    }

    /// One `ModelRelationship` edge per declared relationship.
    pub fn relationship_edges(
        &self,
        metadata: &SemanticMetadata,
        tables: &HashMap<u64, &str>,
    ) -> Vec<LineageEdge> {
        metadata
            .relationships
            .iter()
            .filter_map(|rel| {
                let (Some(from), Some(to)) =
                    (tables.get(&rel.from_table_id), tables.get(&rel.to_table_id))
                else {
                    tracing::debug!(relationship = rel.id, "relationship references unknown table");
                    return None;
                };
                Some(LineageEdge::new(
                    EntityRef::table(from),
                    EntityRef::table(to),
                    DependencyKind::ModelRelationship,
                    &self.relationship_label,
                ))
            })
            .collect()
    }

    /// `SourceMapping` edges recovered from partition mashup text.
    pub fn source_edges(
        &self,
        metadata: &SemanticMetadata,
        tables: &HashMap<u64, &str>,
    ) -> Vec<LineageEdge> {
        metadata
            .partitions
            .iter()
            .flat_map(|partition| {
                match (partition.owner(tables), partition.mashup_text()) {
                    (Some(owner), Some(m_code)) => mashup::source_edges(
                        owner,
                        m_code,
                        &self.source_prefix,
                        &self.source_label,
                    ),
                    _ => Vec::new(),
                }
            })
            .collect()
    }
}

/// Measure index over every measure whose owning table is known.
pub fn measure_index(metadata: &SemanticMetadata, tables: &HashMap<u64, &str>) -> MeasureIndex {
    MeasureIndex::build(
        metadata
            .measures
            .iter()
            .filter_map(|m| tables.get(&m.table_id).map(|t| (m.name.as_str(), *t))),
    )
}

fn formulas<'a>(
    metadata: &'a SemanticMetadata,
    tables: &HashMap<u64, &'a str>,
) -> Vec<Formula<'a>> {
    let measures = metadata.measures.iter().filter_map(|m| {
        let table = known_table(tables, m.table_id, &m.name)?;
        let expression = m.expression.as_deref()?;
        Some(Formula::measure(table, &m.name, expression))
    });
    let columns = metadata.columns.iter().filter_map(|c| {
        let expression = c.expression.as_deref().filter(|e| !e.trim().is_empty())?;
        let table = known_table(tables, c.table_id, &c.name)?;
        Some(Formula::calculated_column(table, &c.name, expression))
    });
    measures.chain(columns).collect()
}

fn known_table<'a>(tables: &HashMap<u64, &'a str>, table_id: u64, member: &str) -> Option<&'a str> {
    let table = tables.get(&table_id).copied();
    if table.is_none() {
        tracing::debug!(table_id, member, "formula owner table not found");
    }
    table
}
