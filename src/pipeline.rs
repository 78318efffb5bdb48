//! Full extraction run: SQL objects + semantic metadata → one lineage graph.

use std::path::Path;

use crate::config::{Settings, SettingsError};
use crate::lineage::{LineageBuilder, LineageGraph};
use crate::model::{load_sql_objects, InputError, SemanticMetadata, SqlObject};
use crate::semantic::SemanticExtractor;
use crate::sql::{SkippedObject, SqlExtractError, SqlLineageExtractor, SqlLineageRow};

/// Error type for a full run. Individual bad definitions never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Sql(#[from] SqlExtractError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fully materialized inputs of one run.
#[derive(Debug, Clone, Default)]
pub struct LineageInputs {
    pub sql_objects: Vec<SqlObject>,
    pub metadata: Option<SemanticMetadata>,
}

impl LineageInputs {
    /// Load whichever input files are given.
    pub fn load(
        sql_objects: Option<&Path>,
        metadata: Option<&Path>,
    ) -> Result<Self, InputError> {
        let sql_objects = match sql_objects {
            Some(path) => load_sql_objects(path)?,
            None => Vec::new(),
        };
        let metadata = metadata
            .map(SemanticMetadata::from_json_file)
            .transpose()?;
        Ok(Self {
            sql_objects,
            metadata,
        })
    }

    /// Load the input files named in `[inputs]`.
    pub fn from_settings(settings: &Settings) -> PipelineResult<Self> {
        let sql_objects = settings.inputs.sql_objects_path()?;
        let metadata = settings.inputs.metadata_path()?;
        Ok(Self::load(sql_objects.as_deref(), metadata.as_deref())?)
    }
}

/// Extractor configuration for one run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub sql: SqlLineageExtractor,
    pub semantic: SemanticExtractor,
    pub parallel: bool,
}

impl BuildOptions {
    pub fn from_settings(settings: &Settings) -> PipelineResult<Self> {
        let sql = SqlLineageExtractor::new(&settings.sql.dialect)?
            .with_comment_stripping(settings.sql.strip_comments);
        let semantic = SemanticExtractor {
            source_prefix: settings.semantic.source_prefix.clone(),
            source_label: settings.semantic.source_label.clone(),
            relationship_label: settings.semantic.relationship_label.clone(),
        };
        Ok(Self {
            sql,
            semantic,
            parallel: settings.extract.parallel,
        })
    }
}

/// The assembled graph plus the per-object SQL rows and run report.
#[derive(Debug, Clone)]
pub struct LineageBuild {
    pub graph: LineageGraph,
    pub sql_rows: Vec<SqlLineageRow>,
    pub skipped: Vec<SkippedObject>,
    /// SQL objects whose definition parsed.
    pub processed: usize,
}

impl LineageBuild {
    /// SQL rows whose target column contains `needle`, case-insensitively.
    pub fn sql_rows_for_column(&self, needle: &str) -> Vec<&SqlLineageRow> {
        self.sql_rows
            .iter()
            .filter(|row| row.matches_target_column(needle))
            .collect()
    }
}

/// Run every extractor and merge their edges into one graph.
pub fn build_lineage(inputs: &LineageInputs, options: &BuildOptions) -> LineageBuild {
    let extraction = options
        .sql
        .extract_all(&inputs.sql_objects, options.parallel);

    let mut builder = LineageBuilder::new();
    let sql_edges = builder.extend(extraction.edges());

    let semantic_edges = match &inputs.metadata {
        Some(metadata) => builder.extend(options.semantic.extract(metadata, options.parallel)),
        None => 0,
    };

    let graph = builder.finish();
    let cycles = graph.cycles();
    if !cycles.is_empty() {
        tracing::warn!(count = cycles.len(), "lineage graph contains reference cycles");
    }

    tracing::info!(
        objects = inputs.sql_objects.len(),
        processed = extraction.processed,
        skipped = extraction.skipped.len(),
        sql_edges,
        semantic_edges,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "lineage build complete"
    );

    LineageBuild {
        graph,
        sql_rows: extraction.rows,
        skipped: extraction.skipped,
        processed: extraction.processed,
    }
}
