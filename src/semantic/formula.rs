//! DAX reference extraction for measures and calculated columns.
//!
//! A reference is `Table[Name]` or `'Quoted Table'[Name]` (a column) or a bare
//! `[Name]` (a measure). Bare names are resolved to their owning table through
//! a [`MeasureIndex`] built once from every known measure.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DependencyKind, EntityRef, LineageEdge};

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:'((?:[^']|'')+)'|([\p{L}\p{N}_]+))?\[([^\]]+)\]").unwrap()
});

static RELATED_LOOKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bRELATED").unwrap());

/// A reference found in a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormulaReference {
    Column { table: String, column: String },
    Measure(String),
}

/// Distinct references in an expression, in order of first appearance.
pub fn extract_references(expression: &str) -> Vec<FormulaReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for caps in REFERENCE.captures_iter(expression) {
        let table = caps
            .get(1)
            .map(|m| m.as_str().replace("''", "'"))
            .or_else(|| caps.get(2).map(|m| m.as_str().to_string()))
            .unwrap_or_default();
        let name = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }

        let reference = if table.trim().is_empty() {
            FormulaReference::Measure(name)
        } else {
            FormulaReference::Column {
                table: table.trim().to_string(),
                column: name,
            }
        };
        if seen.insert(reference.clone()) {
            references.push(reference);
        }
    }
    references
}

/// Whether the text calls a RELATED-style lookup. Purely textual.
pub fn is_related_lookup(expression: &str) -> bool {
    RELATED_LOOKUP.is_match(expression)
}

// =============================================================================
// Measure Index
// =============================================================================

/// Measure name → owning table, built once before extraction.
///
/// Names are matched case-insensitively. When two tables define a measure
/// with the same name, the one inserted last wins.
#[derive(Debug, Clone, Default)]
pub struct MeasureIndex {
    owners: HashMap<String, String>,
}

impl MeasureIndex {
    pub fn build<'a, I>(measures: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let owners = measures
            .into_iter()
            .map(|(name, table)| (name.trim().to_uppercase(), table.to_string()))
            .collect();
        Self { owners }
    }

    pub fn owner_of(&self, measure: &str) -> Option<&str> {
        self.owners
            .get(&measure.trim().to_uppercase())
            .map(String::as_str)
    }

    /// Owning table, or `context_table` when the measure is unknown.
    pub fn resolve<'a>(&'a self, measure: &str, context_table: &'a str) -> &'a str {
        self.owner_of(measure).unwrap_or(context_table)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

// =============================================================================
// Edge Extraction
// =============================================================================

/// What a formula defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaKind {
    Measure,
    CalculatedColumn,
}

/// A measure or calculated column with its expression.
#[derive(Debug, Clone, Copy)]
pub struct Formula<'a> {
    pub kind: FormulaKind,
    pub table: &'a str,
    pub name: &'a str,
    pub expression: &'a str,
}

impl<'a> Formula<'a> {
    pub fn measure(table: &'a str, name: &'a str, expression: &'a str) -> Self {
        Self {
            kind: FormulaKind::Measure,
            table,
            name,
            expression,
        }
    }

    pub fn calculated_column(table: &'a str, name: &'a str, expression: &'a str) -> Self {
        Self {
            kind: FormulaKind::CalculatedColumn,
            table,
            name,
            expression,
        }
    }

    pub fn target(&self) -> EntityRef {
        EntityRef::member(self.table, self.name)
    }

    /// Lineage edges into this formula's target.
    ///
    /// Column references are `ColumnReference`, or `RelatedRelationship` for a
    /// calculated column whose text calls RELATED. Bare references are
    /// `MeasureReference` from the owning table of that measure.
    pub fn edges(&self, index: &MeasureIndex) -> Vec<LineageEdge> {
        if self.expression.trim().is_empty() {
            return Vec::new();
        }
        let target = self.target();
        let column_kind = match self.kind {
            FormulaKind::CalculatedColumn if is_related_lookup(self.expression) => {
                DependencyKind::RelatedRelationship
            }
            _ => DependencyKind::ColumnReference,
        };

        extract_references(self.expression)
            .into_iter()
            .map(|reference| match reference {
                FormulaReference::Column { table, column } => LineageEdge::new(
                    EntityRef::member(&table, &column),
                    target.clone(),
                    column_kind,
                    self.expression,
                ),
                FormulaReference::Measure(measure) => LineageEdge::new(
                    EntityRef::member(index.resolve(&measure, self.table), &measure),
                    target.clone(),
                    DependencyKind::MeasureReference,
                    self.expression,
                ),
            })
            .collect()
    }
}
