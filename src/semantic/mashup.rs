//! Warehouse source tables recovered from Power Query (M) partition text.
//!
//! The locator runs an ordered list of [`Heuristic`]s against the mashup text.
//! A heuristic may rewrite the text for the ones after it, report sources
//! (first success wins), or pass.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DependencyKind, EntityRef, LineageEdge};

static JSON_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)"Query"\s*:\s*("(?:[^"\\]|\\.)*")"#).unwrap());

static NATIVE_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)Value\.NativeQuery\([^,]+,\s*"([^"]+)""#).unwrap());

static FROM_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+([\[\]\w.]+)").unwrap());

static SCHEMA_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[Schema="([^"]+)",\s*Item="([^"]+)"\]"#).unwrap());

static ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"Item="([^"]+)""#).unwrap());

/// Result of applying one heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Replace the text seen by the remaining heuristics.
    Rewrite(String),
    /// Sources found; the chain stops here.
    Found(Vec<String>),
    NoMatch,
}

/// One source-location rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// `{"Query": "..."}` wrapper around the M text.
    JsonQueryWrapper,
    /// `Value.NativeQuery(src, "SELECT ... FROM schema.table")`: first FROM table.
    NativeQuery,
    /// Every `[Schema="X", Item="Y"]` navigation step, as `X.Y`.
    SchemaItemNavigation,
    /// Any bare `Item="Y"`, unqualified.
    ItemFallback,
}

/// Priority order of the locator.
pub const HEURISTICS: [Heuristic; 4] = [
    Heuristic::JsonQueryWrapper,
    Heuristic::NativeQuery,
    Heuristic::SchemaItemNavigation,
    Heuristic::ItemFallback,
];

impl Heuristic {
    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::JsonQueryWrapper => "json-query-wrapper",
            Heuristic::NativeQuery => "native-query",
            Heuristic::SchemaItemNavigation => "schema-item-navigation",
            Heuristic::ItemFallback => "item-fallback",
        }
    }

    pub fn apply(&self, m_code: &str) -> Outcome {
        match self {
            Heuristic::JsonQueryWrapper => unwrap_json_query(m_code)
                .map(Outcome::Rewrite)
                .unwrap_or(Outcome::NoMatch),
            Heuristic::NativeQuery => native_query_table(m_code)
                .map(|table| Outcome::Found(vec![table]))
                .unwrap_or(Outcome::NoMatch),
            Heuristic::SchemaItemNavigation => found_if_any(
                SCHEMA_ITEM
                    .captures_iter(m_code)
                    .map(|caps| format!("{}.{}", &caps[1], &caps[2])),
            ),
            Heuristic::ItemFallback => {
                found_if_any(ITEM.captures_iter(m_code).map(|caps| caps[1].to_string()))
            }
        }
    }
}

fn found_if_any(sources: impl Iterator<Item = String>) -> Outcome {
    let sources: Vec<String> = sources.collect();
    if sources.is_empty() {
        Outcome::NoMatch
    } else {
        Outcome::Found(sources)
    }
}

fn unwrap_json_query(m_code: &str) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(m_code) {
        let query = map
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("query"))
            .and_then(|(_, value)| value.as_str());
        if let Some(query) = query {
            return Some(query.to_string());
        }
    }

    // Wrapper embedded in larger text: decode just the string literal.
    let literal = JSON_QUERY.captures(m_code)?.get(1)?.as_str();
    serde_json::from_str::<String>(literal).ok()
}

fn native_query_table(m_code: &str) -> Option<String> {
    let sql = NATIVE_QUERY.captures(m_code)?.get(1)?.as_str();
    let table = FROM_TABLE.captures(sql)?.get(1)?.as_str();
    let table = table.replace(['[', ']'], "");
    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

/// Source tables named by a mashup expression, de-duplicated in order.
pub fn locate_sources(m_code: &str) -> Vec<String> {
    if m_code.trim().is_empty() {
        return Vec::new();
    }

    let mut text = m_code.to_string();
    for heuristic in HEURISTICS {
        match heuristic.apply(&text) {
            Outcome::Rewrite(rewritten) => text = rewritten,
            Outcome::Found(sources) => {
                tracing::trace!(
                    heuristic = heuristic.name(),
                    count = sources.len(),
                    "mashup sources"
                );
                let mut seen = HashSet::new();
                return sources
                    .into_iter()
                    .filter(|source| seen.insert(source.clone()))
                    .collect();
            }
            Outcome::NoMatch => {}
        }
    }
    Vec::new()
}

/// `SourceMapping` edges from `<prefix>.<source>` into `table`.
pub fn source_edges(table: &str, m_code: &str, prefix: &str, label: &str) -> Vec<LineageEdge> {
    let target = EntityRef::table(table);
    locate_sources(m_code)
        .into_iter()
        .map(|source| {
            LineageEdge::new(
                EntityRef::member(prefix, &source),
                target.clone(),
                DependencyKind::SourceMapping,
                label,
            )
        })
        .collect()
}
