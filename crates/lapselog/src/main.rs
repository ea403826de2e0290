use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use lapselog_core::{
    repair, FailureMode, FileOrder, LogMerger, MergeConfig, MergeReport, PipelineError,
};
use lapselog_parser::revisions::{DEFAULT_REVISION, REVISIONS};
use lapselog_parser::DEFAULT_ADC_MAX_COUNT;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT_NAME: &str = "combined.csv";

#[derive(Parser, Debug)]
#[command(author, version, about = "Combine time-lapse rig sensor logs into one CSV", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every log file in a directory into a single CSV
    Merge(MergeArgs),
    /// Join logs whose records were wrapped over two lines
    Repair(RepairArgs),
    /// List the known hardware revisions
    Revisions,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Directory containing the logger's CSV files
    dir: PathBuf,
    /// Output file (defaults to combined.csv inside DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// TOML configuration file
    #[arg(short, long, env = "LAPSELOG_CONFIG")]
    config: Option<PathBuf>,
    /// Hardware revision preset
    #[arg(short, long)]
    revision: Option<String>,
    /// Abort on the first malformed row instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Fixed UTC offset in hours for the Date column
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,
    /// Number of leading rows to skip in every input file
    #[arg(long)]
    skip_header_rows: Option<usize>,
    /// Merge files in filesystem listing order instead of by name
    #[arg(long)]
    listing_order: bool,
    /// Write the merge report as JSON
    #[arg(long)]
    report_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RepairArgs {
    input: PathBuf,
    output: PathBuf,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json);

    let outcome = match cli.command {
        Command::Merge(args) => handle_merge(args),
        Command::Repair(args) => handle_repair(args),
        Command::Revisions => {
            print_revisions();
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn handle_merge(args: MergeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let merger = LogMerger::from_config(&config).context("invalid merge configuration")?;
    let filter = config.file_filter()?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.dir.join(DEFAULT_OUTPUT_NAME));

    for channel in merger.codec().channels() {
        info!(
            channel = %channel.name,
            column = channel.index,
            full_scale_v = channel.divider.max_measurable(merger.codec().adc_max_count()),
            "voltage channel"
        );
    }

    match merger.merge(&args.dir, &output, |name| filter.matches(name)) {
        Ok(report) => {
            print_report(&report);
            if let Some(path) = &args.report_json {
                write_report_json(path, &report)?;
            }
            Ok(())
        }
        Err(PipelineError::Row {
            failure,
            rows_written,
        }) => {
            warn!(
                output = %output.display(),
                rows_written,
                "output is incomplete and must be discarded"
            );
            Err(PipelineError::Row {
                failure,
                rows_written,
            })
            .context("strict merge aborted")
        }
        Err(err) => Err(err).context("merge failed"),
    }
}

fn resolve_config(args: &MergeArgs) -> Result<MergeConfig> {
    let mut config = match &args.config {
        Some(path) => MergeConfig::load(path)?,
        None => MergeConfig::default(),
    };
    if let Some(revision) = &args.revision {
        config.revision = Some(revision.clone());
        config.channels.clear();
        config.field_count = None;
    }
    if args.strict {
        config.failure_mode = FailureMode::Strict;
    }
    if let Some(hours) = args.utc_offset {
        config.utc_offset_hours = hours;
    }
    if let Some(rows) = args.skip_header_rows {
        config.skip_header_rows = rows;
    }
    if args.listing_order {
        config.file_order = FileOrder::Listing;
    }
    Ok(config)
}

fn print_report(report: &MergeReport) {
    println!(
        "wrote {} rows from {} files to {}",
        report.rows_written,
        report.files.len(),
        report.output_path.display()
    );
    if report.is_clean() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Line", "Error", "Row"]);
    for failure in &report.failures {
        table.add_row(vec![
            failure.file.clone(),
            failure.line.to_string(),
            failure.error.to_string(),
            failure.raw.clone(),
        ]);
    }
    for failure in &report.file_failures {
        table.add_row(vec![
            failure.file.clone(),
            failure.line.map(|line| line.to_string()).unwrap_or_default(),
            failure.message.clone(),
            String::new(),
        ]);
    }
    println!("{table}");
}

fn write_report_json(path: &Path, report: &MergeReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn handle_repair(args: RepairArgs) -> Result<()> {
    let joined = repair::join_split_lines(&args.input, &args.output)
        .with_context(|| format!("failed to repair {}", args.input.display()))?;
    println!("joined {joined} rows into {}", args.output.display());
    Ok(())
}

fn print_revisions() {
    let mut table = Table::new();
    table.set_header(vec!["Revision", "Fields", "Channels", "Description"]);
    for revision in REVISIONS {
        let channels: Vec<String> = revision
            .channels
            .iter()
            .map(|channel| {
                format!(
                    "{}@{} ({:.2} V max)",
                    channel.name,
                    channel.index,
                    channel.divider.max_measurable(DEFAULT_ADC_MAX_COUNT)
                )
            })
            .collect();
        let name = if revision.name == DEFAULT_REVISION {
            format!("{} (default)", revision.name)
        } else {
            revision.name.to_string()
        };
        table.add_row(vec![
            name,
            revision.field_count.to_string(),
            channels.join(", "),
            revision.description.to_string(),
        ]);
    }
    println!("{table}");
}
