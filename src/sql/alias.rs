//! Table alias resolution within one statement.

use std::collections::{BTreeSet, HashMap};
use std::ops::ControlFlow;

use sqlparser::ast::{ObjectName, Query, Select, TableAlias, TableFactor, Visit, Visitor};

use crate::model::EntityRef;

/// Alias (or bare table name) → qualified table name, for one statement scope.
///
/// Keys are upper-cased; T-SQL resolves aliases case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: HashMap<String, String>,
}

impl AliasMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the tables a SELECT brings into scope through its FROM and JOIN
    /// clauses. Tables inside nested queries (derived tables, WHERE and EXISTS
    /// subqueries, scalar subqueries) belong to their own scope and are left out.
    pub fn collect(select: &Select) -> Self {
        let mut map = Self::new();
        map.extend_from(select);
        map
    }

    /// Add the tables `select` brings into scope.
    pub fn extend_from(&mut self, select: &Select) {
        let mut collector = TableCollector {
            map: self,
            nesting: 0,
        };
        let _ = select.visit(&mut collector);
    }

    /// Register one table reference: keyed by its alias if present, else by its
    /// own bare name. The fully qualified name is always registered too.
    pub fn insert(&mut self, name: &ObjectName, alias: Option<&TableAlias>) {
        let qualified = object_name(name);
        if qualified.is_empty() {
            return;
        }
        let key = match alias {
            Some(alias) => alias.name.value.clone(),
            None => name
                .0
                .last()
                .map(|ident| ident.value.clone())
                .unwrap_or_default(),
        };
        self.entries
            .insert(qualified.to_uppercase(), qualified.clone());
        self.entries.insert(key.to_uppercase(), qualified);
    }

    /// Qualified table for an alias; unknown aliases come back unchanged.
    pub fn resolve(&self, alias: &str) -> String {
        self.entries
            .get(&alias.to_uppercase())
            .cloned()
            .unwrap_or_else(|| alias.to_string())
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(&alias.to_uppercase())
    }

    /// The only table in scope, when exactly one distinct table is referenced.
    pub fn sole_table(&self) -> Option<&str> {
        let tables: BTreeSet<&str> = self.entries.values().map(String::as_str).collect();
        if tables.len() == 1 {
            tables.into_iter().next()
        } else {
            None
        }
    }

    /// Entity for a column reference.
    ///
    /// Unqualified columns belong to the sole table in scope; with several
    /// tables in scope the bare column name is returned.
    pub fn resolve_column(&self, qualifier: Option<&str>, column: &str) -> EntityRef {
        match qualifier {
            Some(q) => EntityRef::member(self.resolve(q), column),
            None => match self.sole_table() {
                Some(table) => EntityRef::member(table, column),
                None => EntityRef::new(column),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `schema.table` text of an object name, without quoting.
pub fn object_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

/// Qualified name of a plain table factor.
pub fn table_factor_name(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, .. } => Some(object_name(name)),
        _ => None,
    }
}

/// Alias under which a table factor is visible: its alias, else its bare name.
pub fn table_factor_alias(factor: &TableFactor) -> Option<String> {
    match factor {
        TableFactor::Table { name, alias, .. } => alias
            .as_ref()
            .map(|a| a.name.value.clone())
            .or_else(|| name.0.last().map(|ident| ident.value.clone())),
        TableFactor::Derived { alias, .. } => alias.as_ref().map(|a| a.name.value.clone()),
        _ => None,
    }
}

struct TableCollector<'a> {
    map: &'a mut AliasMap,
    /// Queries entered below the collected SELECT.
    nesting: usize,
}

impl Visitor for TableCollector<'_> {
    type Break = ();

    fn pre_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.nesting += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.nesting -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        if self.nesting > 0 {
            return ControlFlow::Continue(());
        }
        if let TableFactor::Table { name, alias, .. } = table_factor {
            self.map.insert(name, alias.as_ref());
        }
        ControlFlow::Continue(())
    }
}
