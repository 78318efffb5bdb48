//! lineage-lens CLI - build and query column lineage
//!
//! Usage:
//!   lineage-lens [--config <file>] [--sql-objects <file>] [--metadata <file>] <command>
//!
//! Examples:
//!   lineage-lens --sql-objects objects.json --metadata model.json build --format json
//!   lineage-lens --sql-objects objects.json sql --target-column Total
//!   lineage-lens --metadata model.json impact SALES.NETSALES
//!   lineage-lens --sql-objects objects.json usage ODS.SALES SaleId
//!   lineage-lens --metadata model.json nodes

use clap::{Parser, Subcommand, ValueEnum};
use lineage_lens::config::Settings;
use lineage_lens::lineage::format_flow_rows;
use lineage_lens::pipeline::{build_lineage, BuildOptions, LineageBuild, LineageInputs};
use lineage_lens::sql::find_column_usage;
use lineage_lens::{EntityRef, FlowRow, ImpactSummary};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lineage-lens")]
#[command(about = "Column-level lineage across warehouse SQL and tabular semantic models")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to LINEAGE_LENS_CONFIG, ./lineage.toml, user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQL object catalog JSON (overrides [inputs] sql_objects)
    #[arg(long, global = true)]
    sql_objects: Option<PathBuf>,

    /// Semantic model metadata JSON (overrides [inputs] metadata)
    #[arg(long, global = true)]
    metadata: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "lineage_lens=trace" (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the lineage graph and print the flat edge list
    Build {
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Print per-object SQL lineage rows
    Sql {
        /// Keep rows whose target column contains this text
        #[arg(short, long)]
        target_column: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Upstream/downstream impact of one node
    Impact {
        /// Node key, e.g. SALES.NETSALES
        node: String,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Find SQL objects that use a source column
    Usage {
        /// Source table as SCHEMA.TABLE
        table: String,

        /// Source column name
        column: String,

        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// List every node in the lineage graph
    Nodes,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Tab-separated rows with a header
    Table,
    /// Pretty-printed JSON
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(cli.log_level.as_deref(), &settings.logging.level);

    let options = match BuildOptions::from_settings(&settings) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let inputs = match load_inputs(&cli, &settings) {
        Ok(i) => i,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Build { format } => cmd_build(&inputs, &options, format),
        Commands::Sql {
            target_column,
            format,
        } => cmd_sql(&inputs, &options, target_column.as_deref(), format),
        Commands::Impact { node, format } => cmd_impact(&inputs, &options, &node, format),
        Commands::Usage {
            table,
            column,
            format,
        } => cmd_usage(&inputs, &options, &table, &column, format),
        Commands::Nodes => cmd_nodes(&inputs, &options),
    }
}

fn init_logging(cli_level: Option<&str>, settings_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings_level))
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_inputs(cli: &Cli, settings: &Settings) -> Result<LineageInputs, String> {
    let sql_objects = match &cli.sql_objects {
        Some(path) => Some(path.clone()),
        None => settings
            .inputs
            .sql_objects_path()
            .map_err(|e| format!("Configuration error: {}", e))?,
    };
    let metadata = match &cli.metadata {
        Some(path) => Some(path.clone()),
        None => settings
            .inputs
            .metadata_path()
            .map_err(|e| format!("Configuration error: {}", e))?,
    };

    if sql_objects.is_none() && metadata.is_none() {
        return Err(
            "No inputs: pass --sql-objects and/or --metadata, or set [inputs] in lineage.toml"
                .to_string(),
        );
    }

    LineageInputs::load(sql_objects.as_deref(), metadata.as_deref())
        .map_err(|e| format!("Error loading inputs: {}", e))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report_skipped(build: &LineageBuild) {
    for skipped in &build.skipped {
        eprintln!("skipped {}: {}", skipped.object, skipped.reason);
    }
}

fn cmd_build(inputs: &LineageInputs, options: &BuildOptions, format: OutputFormat) -> ExitCode {
    let build = build_lineage(inputs, options);
    report_skipped(&build);

    let edges = build.graph.edges();
    match format {
        OutputFormat::Json => print_json(&edges),
        OutputFormat::Table => {
            println!("Source\tTarget\tDependencyType\tTransformation");
            for edge in &edges {
                println!(
                    "{}\t{}\t{}\t{}",
                    edge.source,
                    edge.target,
                    edge.dependency_type,
                    single_line(&edge.transformation)
                );
            }
            eprintln!(
                "{} nodes, {} edges ({} objects processed, {} skipped)",
                build.graph.node_count(),
                build.graph.edge_count(),
                build.processed,
                build.skipped.len()
            );
            ExitCode::SUCCESS
        }
    }
}

fn cmd_sql(
    inputs: &LineageInputs,
    options: &BuildOptions,
    target_column: Option<&str>,
    format: OutputFormat,
) -> ExitCode {
    let extraction = options.sql.extract_all(&inputs.sql_objects, options.parallel);
    let rows: Vec<_> = extraction
        .rows
        .iter()
        .filter(|row| target_column.map_or(true, |needle| row.matches_target_column(needle)))
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            println!(
                "ObjectName\tObjectType\tTargetTable\tTargetColumn\tSourceColumns\tTransformation"
            );
            for row in rows {
                let sources: Vec<&str> =
                    row.source_columns.iter().map(EntityRef::as_str).collect();
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.object_name,
                    row.object_type,
                    row.target_table,
                    row.target_column,
                    sources.join(", "),
                    single_line(&row.transformation)
                );
            }
            ExitCode::SUCCESS
        }
    }
}

#[derive(Serialize)]
struct ImpactReport<'a> {
    selected: &'a EntityRef,
    summary: ImpactSummary,
    upstream: &'a BTreeSet<EntityRef>,
    downstream: &'a BTreeSet<EntityRef>,
    flow: &'a [FlowRow],
}

fn cmd_impact(
    inputs: &LineageInputs,
    options: &BuildOptions,
    node: &str,
    format: OutputFormat,
) -> ExitCode {
    let build = build_lineage(inputs, options);
    let analysis = match build.graph.impact(&EntityRef::new(node)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let summary = analysis.summary();

    match format {
        OutputFormat::Json => print_json(&ImpactReport {
            selected: &analysis.selected,
            summary,
            upstream: &analysis.upstream,
            downstream: &analysis.downstream,
            flow: &analysis.flow,
        }),
        OutputFormat::Table => {
            println!("Selected:           {}", analysis.selected);
            println!("Upstream nodes:     {}", summary.upstream);
            println!("Downstream nodes:   {}", summary.downstream);
            println!("Total impact:       {}", summary.total_impact);
            println!("Total dependencies: {}", summary.total_dependencies);
            println!();
            print!("{}", format_flow_rows(&analysis.flow));
            ExitCode::SUCCESS
        }
    }
}

fn cmd_usage(
    inputs: &LineageInputs,
    options: &BuildOptions,
    table: &str,
    column: &str,
    format: OutputFormat,
) -> ExitCode {
    let rows = find_column_usage(&options.sql, &inputs.sql_objects, table, column);

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            if rows.is_empty() {
                eprintln!("No usage of {}.{} found", table, column);
                return ExitCode::SUCCESS;
            }
            println!(
                "SourceTable\tSourceColumn\tObjectName\tObjectType\tObjectColumn\tTransformation"
            );
            for row in &rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.source_table,
                    row.source_column,
                    row.object_name,
                    row.object_type,
                    row.object_column,
                    single_line(&row.transformation)
                );
            }
            ExitCode::SUCCESS
        }
    }
}

fn cmd_nodes(inputs: &LineageInputs, options: &BuildOptions) -> ExitCode {
    let build = build_lineage(inputs, options);
    for node in build.graph.nodes() {
        println!("{}", node);
    }
    ExitCode::SUCCESS
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
