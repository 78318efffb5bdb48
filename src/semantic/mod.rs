//! Semantic-model lineage: DAX formulas, relationships and Power Query sources.
//!
//! - [`formula`]: `Table[Column]` / `[Measure]` references and the measure index
//! - [`mashup`]: ordered heuristics locating warehouse tables in M text
//! - [`extract`]: turns a [`SemanticMetadata`](crate::model::SemanticMetadata) into edges

pub mod extract;
pub mod formula;
pub mod mashup;

pub use extract::{
    measure_index, SemanticExtractor, DEFAULT_RELATIONSHIP_LABEL, DEFAULT_SOURCE_LABEL,
    DEFAULT_SOURCE_PREFIX,
};
pub use formula::{
    extract_references, is_related_lookup, Formula, FormulaKind, FormulaReference, MeasureIndex,
};
pub use mashup::{locate_sources, source_edges, Heuristic, Outcome, HEURISTICS};
