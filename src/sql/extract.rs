//! SQL lineage extraction over views and stored procedures.
//!
//! Every parsed statement is classified into one [`StatementShape`] and
//! dispatched by a single match:
//!
//! ```text
//! CREATE VIEW … AS SELECT     → Select  (target = the view)
//! INSERT INTO t (…) SELECT …  → Insert  (target = t, paired positionally)
//! MERGE INTO t USING s …      → Merge   (UPDATE assignments + INSERT values)
//! ```
//!
//! Anything else (DDL, control flow, standalone SELECTs inside procedures)
//! produces no lineage.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use sqlparser::ast::{
    AssignmentTarget, Expr, Insert, MergeAction, MergeClause, MergeInsertKind, Query, Select,
    SetExpr, Statement, TableFactor,
};
use sqlparser::dialect::{dialect_from_str, Dialect, MsSqlDialect};

use super::alias::{object_name, table_factor_alias, table_factor_name, AliasMap};
use super::error::{SqlExtractError, SqlExtractResult};
use super::source::{clean_sql, parse_definition, ParsedDefinition};
use super::usage::{
    column_references, match_projection, output_name, projection_expr, SubqueryDepth,
};
use crate::model::{DependencyKind, EntityRef, LineageEdge, ObjectKind, SqlObject};

// =============================================================================
// Output Types
// =============================================================================

/// One target column produced by one statement of one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlLineageRow {
    /// The view or procedure containing the statement.
    pub object_name: String,
    pub object_type: ObjectKind,
    pub target_table: String,
    pub target_column: String,
    pub source_columns: Vec<EntityRef>,
    pub transformation: String,
}

impl SqlLineageRow {
    pub fn target(&self) -> EntityRef {
        EntityRef::member(&self.target_table, &self.target_column)
    }

    /// One `ColumnReference` edge per source column.
    pub fn edges(&self) -> impl Iterator<Item = LineageEdge> + '_ {
        let target = self.target();
        self.source_columns.iter().map(move |source| {
            LineageEdge::new(
                source.clone(),
                target.clone(),
                DependencyKind::ColumnReference,
                self.transformation.clone(),
            )
        })
    }

    /// Case-insensitive substring match on the target column.
    pub fn matches_target_column(&self, needle: &str) -> bool {
        self.target_column
            .to_uppercase()
            .contains(&needle.trim().to_uppercase())
    }
}

/// An object whose definition could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedObject {
    pub object: String,
    pub reason: String,
}

/// Result of extracting a batch of objects.
#[derive(Debug, Clone, Default)]
pub struct SqlExtraction {
    pub rows: Vec<SqlLineageRow>,
    pub skipped: Vec<SkippedObject>,
    /// Objects with a definition that parsed.
    pub processed: usize,
}

impl SqlExtraction {
    pub fn edges(&self) -> Vec<LineageEdge> {
        self.rows.iter().flat_map(SqlLineageRow::edges).collect()
    }
}

// =============================================================================
// Statement Shapes
// =============================================================================

/// The closed set of statement shapes that carry lineage.
enum StatementShape<'a> {
    Select {
        query: &'a Query,
        /// Explicit view column list, possibly empty.
        columns: Vec<String>,
    },
    Insert(&'a Insert),
    Merge {
        table: &'a TableFactor,
        source: &'a TableFactor,
        clauses: &'a [MergeClause],
    },
}

fn collect_shapes<'a>(
    statement: &'a Statement,
    kind: ObjectKind,
    shapes: &mut Vec<StatementShape<'a>>,
) {
    match statement {
        Statement::CreateView { columns, query, .. } => shapes.push(StatementShape::Select {
            query,
            columns: columns.iter().map(|c| c.name.value.clone()).collect(),
        }),
        Statement::CreateProcedure { body, .. } => {
            for inner in body {
                collect_shapes(inner, kind, shapes);
            }
        }
        Statement::Insert(insert) => shapes.push(StatementShape::Insert(insert)),
        Statement::Merge {
            table,
            source,
            clauses,
            ..
        } => shapes.push(StatementShape::Merge {
            table,
            source,
            clauses,
        }),
        Statement::Query(query) => match query.body.as_ref() {
            // WITH … INSERT
            SetExpr::Insert(inner) => collect_shapes(inner, kind, shapes),
            _ if kind == ObjectKind::View => shapes.push(StatementShape::Select {
                query,
                columns: Vec::new(),
            }),
            _ => {}
        },
        _ => {}
    }
}

/// Every SELECT branch of a query body (set operations flattened).
fn selects_of(body: &SetExpr) -> Vec<&Select> {
    match body {
        SetExpr::Select(select) => vec![select.as_ref()],
        SetExpr::Query(query) => selects_of(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            let mut selects = selects_of(left);
            selects.extend(selects_of(right));
            selects
        }
        _ => Vec::new(),
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Extracts column lineage from warehouse object definitions.
#[derive(Debug, Clone)]
pub struct SqlLineageExtractor {
    dialect: String,
    strip_comments: bool,
}

impl Default for SqlLineageExtractor {
    fn default() -> Self {
        Self {
            dialect: "mssql".to_string(),
            strip_comments: true,
        }
    }
}

impl SqlLineageExtractor {
    /// Extractor for a sqlparser dialect name (`mssql`, `generic`, `postgres`, …).
    pub fn new(dialect: &str) -> SqlExtractResult<Self> {
        if dialect_from_str(dialect).is_none() {
            return Err(SqlExtractError::UnknownDialect(dialect.to_string()));
        }
        Ok(Self {
            dialect: dialect.to_string(),
            strip_comments: true,
        })
    }

    pub fn with_comment_stripping(mut self, strip_comments: bool) -> Self {
        self.strip_comments = strip_comments;
        self
    }

    fn parser_dialect(&self) -> Box<dyn Dialect> {
        dialect_from_str(&self.dialect).unwrap_or_else(|| Box::new(MsSqlDialect {}))
    }

    /// Parse an object's definition. Objects without one yield no statements.
    pub fn parse_object(&self, object: &SqlObject) -> SqlExtractResult<Vec<Statement>> {
        Ok(self.parse_definition_of(object)?.statements)
    }

    fn parse_definition_of(&self, object: &SqlObject) -> SqlExtractResult<ParsedDefinition> {
        let Some(definition) = object.definition.as_deref() else {
            return Ok(ParsedDefinition::default());
        };
        if object.kind == ObjectKind::Table || definition.trim().is_empty() {
            return Ok(ParsedDefinition::default());
        }
        let text = if self.strip_comments {
            clean_sql(definition)
        } else {
            definition.to_string()
        };
        parse_definition(self.parser_dialect().as_ref(), &object.qualified_name(), &text)
    }

    /// Lineage rows for one object.
    ///
    /// A procedure whose body only partly parsed is an error when none of the
    /// recovered statements carries lineage.
    pub fn extract_object(&self, object: &SqlObject) -> SqlExtractResult<Vec<SqlLineageRow>> {
        let parsed = self.parse_definition_of(object)?;
        let statements = &parsed.statements;

        let mut shapes = Vec::new();
        for statement in statements {
            collect_shapes(statement, object.kind, &mut shapes);
        }
        if shapes.is_empty() {
            if let Some(message) = parsed.failures.first() {
                return Err(SqlExtractError::Parse {
                    object: object.qualified_name(),
                    message: message.clone(),
                });
            }
        }

        let mut rows = Vec::new();
        for shape in shapes {
            match shape {
                StatementShape::Select { query, columns } => {
                    rows.extend(select_rows(object, query, &columns, &object.qualified_name()));
                }
                StatementShape::Insert(insert) => {
                    rows.extend(insert_rows(object, insert));
                }
                StatementShape::Merge {
                    table,
                    source,
                    clauses,
                } => {
                    rows.extend(merge_rows(object, table, source, clauses));
                }
            }
        }

        tracing::debug!(
            object = %object.qualified_name(),
            statements = statements.len(),
            rows = rows.len(),
            "extracted sql lineage"
        );
        Ok(rows)
    }

    /// Extract every object, skipping the ones that fail to parse.
    pub fn extract_all(&self, objects: &[SqlObject], parallel: bool) -> SqlExtraction {
        let extract = |object: &SqlObject| {
            let has_definition = object
                .definition
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty());
            (
                object.qualified_name(),
                has_definition,
                self.extract_object(object),
            )
        };

        let results: Vec<_> = if parallel {
            objects.par_iter().map(extract).collect()
        } else {
            objects.iter().map(extract).collect()
        };

        let mut extraction = SqlExtraction::default();
        for (object, has_definition, result) in results {
            match result {
                Ok(rows) => {
                    if has_definition {
                        extraction.processed += 1;
                    }
                    extraction.rows.extend(rows);
                }
                Err(e) => {
                    tracing::warn!(object = %object, error = %e, "skipping object");
                    extraction.skipped.push(SkippedObject {
                        object,
                        reason: e.to_string(),
                    });
                }
            }
        }
        extraction
    }
}

// =============================================================================
// SELECT / INSERT
// =============================================================================

/// Rows for a query whose projections land in `target_table`.
///
/// `columns` names the targets positionally; when empty, the first branch's
/// output names are used for every branch.
fn select_rows(
    object: &SqlObject,
    query: &Query,
    columns: &[String],
    target_table: &str,
) -> Vec<SqlLineageRow> {
    let selects = selects_of(&query.body);

    let names: Vec<Option<String>> = if columns.is_empty() {
        selects
            .first()
            .map(|select| select.projection.iter().map(output_name).collect())
            .unwrap_or_default()
    } else {
        columns.iter().cloned().map(Some).collect()
    };

    let mut rows = Vec::new();
    for select in selects {
        let aliases = AliasMap::collect(select);
        for (position, item) in select.projection.iter().enumerate() {
            let target = names.get(position).and_then(|n| n.as_deref());
            let Some(projection) = match_projection(item, target, &aliases) else {
                continue;
            };
            rows.push(SqlLineageRow {
                object_name: object.qualified_name(),
                object_type: object.kind,
                target_table: target_table.to_string(),
                target_column: projection.target_column,
                source_columns: projection.sources,
                transformation: projection.transformation,
            });
        }
    }
    rows
}

fn insert_rows(object: &SqlObject, insert: &Insert) -> Vec<SqlLineageRow> {
    let Some(source) = &insert.source else {
        return Vec::new();
    };
    let target_table = object_name(&insert.table_name);
    let columns: Vec<String> = insert.columns.iter().map(|c| c.value.clone()).collect();
    select_rows(object, source, &columns, &target_table)
}

// =============================================================================
// MERGE
// =============================================================================

/// The inline subquery of a MERGE USING clause, resolved one level deep.
struct UsingSubquery<'a> {
    /// Output name (upper-cased) → projection expression.
    projections: HashMap<String, &'a Expr>,
    /// Tables referenced inside the subquery.
    aliases: AliasMap,
}

impl<'a> UsingSubquery<'a> {
    fn from_factor(source: &'a TableFactor) -> Option<Self> {
        let TableFactor::Derived { subquery, .. } = source else {
            return None;
        };
        let select = selects_of(&subquery.body).into_iter().next()?;

        let mut projections = HashMap::new();
        for item in &select.projection {
            if let (Some(name), Some(expr)) = (output_name(item), projection_expr(item)) {
                projections.insert(name.to_uppercase(), expr);
            }
        }
        Some(Self {
            projections,
            aliases: AliasMap::collect(select),
        })
    }

    /// Underlying sources of one subquery output column.
    fn resolve(&self, column: &str) -> Option<Vec<EntityRef>> {
        let projection = self.projections.get(&column.to_uppercase())?;
        let inner = column_references(projection, SubqueryDepth::TopLevelOnly);
        if inner.columns.is_empty() && inner.opaque.is_empty() {
            return Some(vec![EntityRef::new(projection.to_string())]);
        }
        let mut sources: Vec<EntityRef> = inner
            .columns
            .iter()
            .map(|c| c.resolve(&self.aliases))
            .collect();
        sources.extend(inner.opaque.iter().map(EntityRef::new));
        Some(sources)
    }
}

fn merge_rows(
    object: &SqlObject,
    table: &TableFactor,
    source: &TableFactor,
    clauses: &[MergeClause],
) -> Vec<SqlLineageRow> {
    let Some(target_table) = table_factor_name(table) else {
        return Vec::new();
    };

    let mut aliases = AliasMap::new();
    for factor in [table, source] {
        if let TableFactor::Table { name, alias, .. } = factor {
            aliases.insert(name, alias.as_ref());
        }
    }
    let using_alias = table_factor_alias(source);
    let using = UsingSubquery::from_factor(source);

    let resolver = MergeResolver {
        aliases: &aliases,
        using_alias: using_alias.as_deref(),
        using: using.as_ref(),
    };

    let mut rows = Vec::new();
    let mut push = |target_column: String, value: &Expr| {
        let transformation = value.to_string();
        let mut source_columns = resolver.sources(value);
        if source_columns.is_empty() {
            source_columns.push(EntityRef::new(&transformation));
        }
        rows.push(SqlLineageRow {
            object_name: object.qualified_name(),
            object_type: object.kind,
            target_table: target_table.clone(),
            target_column,
            source_columns,
            transformation,
        });
    };

    for clause in clauses {
        match &clause.action {
            MergeAction::Update { assignments, .. } => {
                for assignment in assignments {
                    if let Some(column) = assignment_column(&assignment.target) {
                        push(column, &assignment.value);
                    }
                }
            }
            MergeAction::Insert(insert) => {
                if let MergeInsertKind::Values(values) = &insert.kind {
                    for row in &values.rows {
                        for (column, value) in insert.columns.iter().zip(row) {
                            push(column.value.clone(), value);
                        }
                    }
                }
            }
            MergeAction::Delete => {}
        }
    }
    rows
}

struct MergeResolver<'a> {
    aliases: &'a AliasMap,
    using_alias: Option<&'a str>,
    using: Option<&'a UsingSubquery<'a>>,
}

impl MergeResolver<'_> {
    /// Sources of a MERGE right-hand side. References through the USING alias
    /// go through the subquery projections; everything else resolves directly.
    fn sources(&self, value: &Expr) -> Vec<EntityRef> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for column in column_references(value, SubqueryDepth::Unbounded).columns {
            let through_using = self
                .using_alias
                .is_some_and(|alias| column.is_qualified_by(alias));

            let resolved = match (through_using, self.using) {
                (true, Some(using)) => using
                    .resolve(&column.name)
                    .unwrap_or_else(|| vec![EntityRef::new(column.to_string())]),
                _ => vec![column.resolve(self.aliases)],
            };

            for entity in resolved {
                if seen.insert(entity.clone()) {
                    sources.push(entity);
                }
            }
        }
        sources
    }
}

fn assignment_column(target: &AssignmentTarget) -> Option<String> {
    match target {
        AssignmentTarget::ColumnName(name) => name.0.last().map(|ident| ident.value.clone()),
        AssignmentTarget::Tuple(_) => None,
    }
}
