//! Column references inside expressions, and projection → producing expression matching.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sqlparser::ast::{Expr, Query, Select, SelectItem, SetExpr, Statement, Visit, Visitor};

use super::alias::AliasMap;
use super::extract::SqlLineageExtractor;
use crate::model::{EntityRef, ObjectKind, SqlObject};

// =============================================================================
// Column Reference Collection
// =============================================================================

/// A column as written in the statement: optional qualifier plus column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnName {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnName {
    /// Resolve through an alias map.
    pub fn resolve(&self, aliases: &AliasMap) -> EntityRef {
        aliases.resolve_column(self.qualifier.as_deref(), &self.name)
    }

    /// Matches a qualifier case-insensitively.
    pub fn is_qualified_by(&self, alias: &str) -> bool {
        self.qualifier
            .as_deref()
            .is_some_and(|q| q.eq_ignore_ascii_case(alias))
    }
}

impl std::fmt::Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Column references found in one expression tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnReferences {
    /// Distinct columns, in discovery order.
    pub columns: Vec<ColumnName>,
    /// Rendered text of subqueries that were not descended into.
    pub opaque: Vec<String>,
}

/// How far into nested subqueries to look for columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryDepth {
    /// Collect columns from every nested subquery.
    Unbounded,
    /// Stop at the first subquery and keep its rendered text instead.
    TopLevelOnly,
}

/// Collect every column reference in `expr`.
pub fn column_references(expr: &Expr, depth: SubqueryDepth) -> ColumnReferences {
    let mut collector = ColumnCollector {
        depth,
        nesting: 0,
        seen: HashSet::new(),
        found: ColumnReferences::default(),
    };
    let _ = expr.visit(&mut collector);
    collector.found
}

struct ColumnCollector {
    depth: SubqueryDepth,
    nesting: usize,
    seen: HashSet<ColumnName>,
    found: ColumnReferences,
}

impl ColumnCollector {
    fn push(&mut self, column: ColumnName) {
        // T-SQL variables parse as identifiers
        if column.name.starts_with('@') {
            return;
        }
        if self.seen.insert(column.clone()) {
            self.found.columns.push(column);
        }
    }
}

impl Visitor for ColumnCollector {
    type Break = ();

    fn pre_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.nesting += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.nesting -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if self.depth == SubqueryDepth::TopLevelOnly && self.nesting > 0 {
            return ControlFlow::Continue(());
        }
        match expr {
            Expr::Identifier(ident) => self.push(ColumnName {
                qualifier: None,
                name: ident.value.clone(),
            }),
            Expr::CompoundIdentifier(parts) => {
                let Some((column, qualifier)) = parts.split_last() else {
                    return ControlFlow::Continue(());
                };
                let qualifier = qualifier
                    .iter()
                    .map(|ident| ident.value.as_str())
                    .collect::<Vec<_>>()
                    .join(".");
                self.push(ColumnName {
                    qualifier: (!qualifier.is_empty()).then_some(qualifier),
                    name: column.value.clone(),
                });
            }
            Expr::Subquery(_) | Expr::Exists { .. }
                if self.depth == SubqueryDepth::TopLevelOnly =>
            {
                self.found.opaque.push(expr.to_string());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

// =============================================================================
// Projection Matching
// =============================================================================

/// The expression that produces one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionLineage {
    pub target_column: String,
    pub sources: Vec<EntityRef>,
    pub transformation: String,
}

/// Output name of a projection: its alias, or the column name of a bare column.
///
/// Other unaliased expressions are named by their rendering; wildcards have no name.
pub fn output_name(item: &SelectItem) -> Option<String> {
    match item {
        SelectItem::ExprWithAlias { alias, .. } => Some(alias.value.clone()),
        SelectItem::UnnamedExpr(expr) => Some(expr_output_name(expr)),
        _ => None,
    }
}

fn expr_output_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

/// The expression of a projection, if it has one.
pub fn projection_expr(item: &SelectItem) -> Option<&Expr> {
    match item {
        SelectItem::ExprWithAlias { expr, .. } | SelectItem::UnnamedExpr(expr) => Some(expr),
        _ => None,
    }
}

/// Match one projection to the target column it produces.
///
/// `target` overrides the output name (INSERT column lists, view column lists).
/// Wildcards yield nothing.
pub fn match_projection(
    item: &SelectItem,
    target: Option<&str>,
    aliases: &AliasMap,
) -> Option<ProjectionLineage> {
    let expr = projection_expr(item)?;
    let target_column = match target {
        Some(name) => name.to_string(),
        None => output_name(item)?,
    };

    let mut seen = HashSet::new();
    let sources = column_references(expr, SubqueryDepth::Unbounded)
        .columns
        .iter()
        .map(|column| column.resolve(aliases))
        .filter(|entity| seen.insert(entity.clone()))
        .collect();

    Some(ProjectionLineage {
        target_column,
        sources,
        transformation: expr.to_string(),
    })
}

// =============================================================================
// Column Usage Search
// =============================================================================

/// A projection that consumes a given source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnUsage {
    pub object_column: String,
    pub transformation: String,
}

/// Find every SELECT projection, at any nesting level, that uses `source_column`.
///
/// Aliased projections match when any column inside them has that name; bare
/// column projections match on their own name.
pub fn column_usage(statements: &[Statement], source_column: &str) -> Vec<ColumnUsage> {
    let mut finder = UsageFinder {
        column: source_column.trim().to_uppercase(),
        usages: Vec::new(),
    };
    for statement in statements {
        let _ = statement.visit(&mut finder);
    }
    finder.usages
}

struct UsageFinder {
    column: String,
    usages: Vec<ColumnUsage>,
}

impl UsageFinder {
    fn scan_select(&mut self, select: &Select) {
        for item in &select.projection {
            match item {
                SelectItem::ExprWithAlias { expr, alias } => {
                    let uses_column = column_references(expr, SubqueryDepth::Unbounded)
                        .columns
                        .iter()
                        .any(|c| c.name.to_uppercase() == self.column);
                    if uses_column {
                        self.usages.push(ColumnUsage {
                            object_column: alias.value.clone(),
                            transformation: expr.to_string(),
                        });
                    }
                }
                SelectItem::UnnamedExpr(
                    expr @ (Expr::Identifier(_) | Expr::CompoundIdentifier(_)),
                ) => {
                    let name = expr_output_name(expr);
                    if name.to_uppercase() == self.column {
                        self.usages.push(ColumnUsage {
                            object_column: name,
                            transformation: expr.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn scan_body(&mut self, body: &SetExpr) {
        match body {
            SetExpr::Select(select) => self.scan_select(select),
            SetExpr::SetOperation { left, right, .. } => {
                self.scan_body(left);
                self.scan_body(right);
            }
            // Nested queries are visited on their own
            _ => {}
        }
    }
}

impl Visitor for UsageFinder {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        self.scan_body(&query.body);
        ControlFlow::Continue(())
    }
}

static INSERT_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)INSERT\s+INTO\s+\[?(\w+)\]?\.\[?(\w+)\]?").unwrap()
});

/// First `INSERT INTO schema.table` target named in a definition.
pub fn insert_target(definition: &str) -> Option<String> {
    let caps = INSERT_TARGET.captures(definition)?;
    Some(format!("{}.{}", &caps[1], &caps[2]))
}

/// One object that consumes a source column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnUsageRow {
    pub source_table: String,
    pub source_column: String,
    pub object_name: String,
    pub object_type: ObjectKind,
    pub object_column: String,
    pub transformation: String,
}

/// Search all SQL objects for projections that consume `table.column`.
///
/// Only objects whose definition mentions the bare table name are parsed.
/// Procedures also attribute each usage to their first `INSERT INTO` target,
/// reported with object type `TABLE`.
pub fn find_column_usage(
    extractor: &SqlLineageExtractor,
    objects: &[SqlObject],
    table: &str,
    column: &str,
) -> Vec<ColumnUsageRow> {
    let table = table.trim().to_uppercase();
    let column = column.trim().to_uppercase();
    let bare_table = table.rsplit('.').next().unwrap_or(&table).to_string();

    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for object in objects {
        let Some(definition) = object.definition.as_deref() else {
            continue;
        };
        if !definition.to_uppercase().contains(&bare_table) {
            continue;
        }
        let statements = match extractor.parse_object(object) {
            Ok(statements) => statements,
            Err(e) => {
                tracing::warn!(
                    object = %object.qualified_name(),
                    error = %e,
                    "skipping object in usage search"
                );
                continue;
            }
        };

        let target = (object.kind == ObjectKind::StoredProcedure)
            .then(|| insert_target(definition))
            .flatten();

        for usage in column_usage(&statements, &column) {
            let mut push = |object_name: String, object_type: ObjectKind| {
                let row = ColumnUsageRow {
                    source_table: table.clone(),
                    source_column: column.clone(),
                    object_name,
                    object_type,
                    object_column: usage.object_column.clone(),
                    transformation: usage.transformation.clone(),
                };
                if seen.insert(row.clone()) {
                    rows.push(row);
                }
            };
            push(object.qualified_name(), object.kind);
            if let Some(target) = &target {
                push(target.clone(), ObjectKind::Table);
            }
        }
    }

    rows
}
