#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use aws_ec_info::app::cache_explorer::{
    EngineFilter, NamePattern, QueryCoordinator, QueryReport, SdkClientFactory, StatusChannel,
};
use aws_ec_info::app::config::QueryConfig;
use aws_ec_info::app::error::EcInfoError;
use aws_ec_info::app::fields::{parse_info_types, InfoField};
use aws_ec_info::app::formatters::{
    format_markdown, resolve_output_path, write_output, OutputFormat,
};

const DEFAULT_LOG_FILTER: &str =
    "aws_ec_info=info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn";
const VERBOSE_LOG_FILTER: &str =
    "aws_ec_info=debug,aws_config=warn,aws_smithy_runtime=warn,hyper=warn";

/// Query and export AWS ElastiCache cluster information across a Global Datastore
#[derive(Parser, Debug)]
#[command(name = "aws-ec-info")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("AWS_EC_INFO_GIT_COMMIT"), ")"))]
#[command(after_help = "Examples:
  aws-ec-info -r us-east-1
  aws-ec-info -r us-east-1 -e redis -c \"prod-*\"
  aws-ec-info -r us-east-1 -i region,type,name,node-type
  aws-ec-info -r us-east-1 -f markdown -o output.md")]
struct Cli {
    /// AWS region to start from
    #[arg(short, long)]
    region: String,

    /// AWS profile (overrides the configuration file)
    #[arg(short, long)]
    profile: Option<String>,

    /// Engine filter, comma separated
    #[arg(short, long, default_value = "redis,valkey,memcached")]
    engine: String,

    /// Cluster name filter; supports `*`, `?` and `[...]`
    #[arg(short, long)]
    cluster: Option<String>,

    /// Fields to output, comma separated, or `all`
    #[arg(short, long = "info-type", default_value = "all")]
    info_type: String,

    /// Output format: csv or markdown
    #[arg(short = 'f', long = "output-format", default_value = "csv")]
    output_format: String,

    /// Output file, or a directory for a generated file name
    #[arg(short, long = "output-file", default_value = "./output/")]
    output_file: String,

    /// Maximum number of regions queried at once (overrides the configuration file)
    #[arg(long)]
    max_concurrent_regions: Option<usize>,

    /// Configuration file (default: <config dir>/aws-ec-info/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    // RUST_LOG takes precedence over --verbose
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();

    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

/// Validated command line input
struct Invocation {
    region: String,
    engine_filter: EngineFilter,
    name_filter: Option<NamePattern>,
    fields: Vec<InfoField>,
    format: OutputFormat,
    config: QueryConfig,
}

fn validate(cli: &Cli) -> Result<Invocation, EcInfoError> {
    let region = cli.region.trim().to_string();
    if region.is_empty() {
        return Err(EcInfoError::MissingRegion);
    }

    let mut config = QueryConfig::load(cli.config.as_deref())?;
    if let Some(profile) = &cli.profile {
        config.profile = profile.clone();
    }
    if let Some(max) = cli.max_concurrent_regions {
        config.max_concurrent_regions = max.max(1);
    }

    Ok(Invocation {
        region,
        engine_filter: EngineFilter::parse(&cli.engine)?,
        name_filter: cli.cluster.as_deref().map(NamePattern::new),
        fields: parse_info_types(&cli.info_type)?,
        format: cli.output_format.parse()?,
        config,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let invocation = validate(&cli)?;

    tracing::info!("=== AWS ElastiCache Info ===");
    tracing::info!("Region: {}", invocation.region);
    tracing::info!("Profile: {}", invocation.config.profile);
    tracing::info!("Engine filter: {}", invocation.engine_filter);
    tracing::info!(
        "Cluster filter: {}",
        invocation.name_filter.as_ref().map_or("all", NamePattern::as_str)
    );
    tracing::info!("Output format: {}", invocation.format);

    let progress = Arc::new(StatusChannel::with_echo());
    let coordinator = QueryCoordinator::new(
        Arc::new(SdkClientFactory::new(invocation.config.client_settings())),
        progress,
        invocation.config.coordinator_config(),
    );

    let report = coordinator
        .run_with_report(
            &invocation.region,
            &invocation.engine_filter,
            invocation.name_filter.as_ref(),
        )
        .await?;

    print_summary(&report);

    if report.records.is_empty() {
        eprintln!("No ElastiCache clusters matched the filters");
        return Ok(());
    }

    println!("{}", format_markdown(&report.records, &invocation.fields));

    let content = invocation
        .format
        .format(&report.records, &invocation.fields)
        .context("Failed to format output")?;
    let path = resolve_output_path(
        &cli.output_file,
        &invocation.region,
        invocation.format,
        chrono::Local::now(),
    );
    write_output(&path, &content)?;

    let shown = std::fs::canonicalize(&path).unwrap_or(path);
    eprintln!("Output saved to {}", shown.display());
    Ok(())
}

fn print_summary(report: &QueryReport) {
    eprintln!(
        "Found {} ElastiCache clusters in {} regions",
        report.records.len(),
        report.regions.len()
    );
    for failure in &report.failures {
        eprintln!("  {} skipped: {}", failure.region, failure.error);
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<EcInfoError>() {
        Some(classified) => {
            eprintln!("Error: {}", classified);
            if let Some(suggestion) = classified.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Run failed: {:?}", e);
            report_error(&e);
            ExitCode::from(1)
        }
    }
}
