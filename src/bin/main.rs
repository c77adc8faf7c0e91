//! Tributary CLI - Run multi-site reports from fixture files
//!
//! Usage:
//!   tributary run --fixtures <dir> --dimensions <d1,d2> --metrics <m1,m2> [--site <id>]...
//!   tributary sites
//!   tributary validate
//!
//! Examples:
//!   tributary run --config tributary.toml --fixtures ./fixtures \
//!       --dimensions query --metrics clicks,impressions
//!   tributary run --fixtures ./fixtures --dimensions page --metrics pv,site.cv --format json
//!   tributary sites --config tributary.toml
//!   tributary validate --config tributary.toml

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tributary::config::{Settings, SettingsError};
use tributary::query::{DimensionInput, FixtureSource, MergeMode, MetricInput, Runner};
use tributary::Frame;

#[derive(Parser)]
#[command(name = "tributary")]
#[command(about = "Tributary - Multi-site reporting pipeline")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the config file (standard search order when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a report across the site table
    Run {
        /// Directory of per-site fixture files (<id>.json)
        #[arg(long)]
        fixtures: PathBuf,

        /// Dimension names, comma separated
        #[arg(long, value_delimiter = ',')]
        dimensions: Vec<String>,

        /// Metric names, comma separated (site.<key> references allowed)
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<String>,

        /// Restrict to these site identifiers (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,

        /// How call groups merge within a site
        #[arg(long, default_value = "outer")]
        merge: MergeArg,

        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// List the configured sites
    Sites,

    /// Validate the config file without running anything
    Validate,
}

#[derive(Clone, ValueEnum)]
enum MergeArg {
    Outer,
    Left,
}

impl From<MergeArg> for MergeMode {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Outer => MergeMode::Outer,
            MergeArg::Left => MergeMode::Left,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Aligned text table
    Table,
    /// One JSON object per row
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run {
            fixtures,
            dimensions,
            metrics,
            sites,
            merge,
            format,
        } => cmd_run(&settings, &fixtures, dimensions, metrics, sites, merge, format),
        Commands::Sites => cmd_sites(&settings),
        Commands::Validate => cmd_validate(&settings),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

fn cmd_run(
    settings: &Settings,
    fixtures: &Path,
    dimensions: Vec<String>,
    metrics: Vec<String>,
    site_ids: Vec<String>,
    merge: MergeArg,
    format: OutputFormat,
) -> ExitCode {
    if dimensions.is_empty() && metrics.is_empty() {
        eprintln!("Nothing to query: pass --dimensions and/or --metrics");
        return ExitCode::FAILURE;
    }

    let sites = match settings.select_sites(&site_ids) {
        Ok(sites) => sites,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source =
        FixtureSource::new(fixtures).with_item_key(settings.defaults.item_key.as_str());
    let runner = Runner::new(&source);
    let options = settings.run_options().with_merge(merge.into());

    let dimensions: Vec<DimensionInput> = dimensions
        .iter()
        .map(|name| DimensionInput::from(name.as_str()))
        .collect();
    let metrics: Vec<MetricInput> = metrics
        .iter()
        .map(|name| MetricInput::from(name.as_str()))
        .collect();

    match runner.run_all(&sites, &dimensions, &metrics, &options) {
        Ok(report) => {
            match format {
                OutputFormat::Table => println!("{}", report),
                OutputFormat::Json => println!("{}", json_rows(report.frame())),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Query error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_sites(settings: &Settings) -> ExitCode {
    if settings.sites.is_empty() {
        println!("No sites configured.");
        return ExitCode::SUCCESS;
    }

    println!("Sites:");
    for site in &settings.sites {
        let id = site
            .identifier(&settings.defaults.item_key)
            .unwrap_or_else(|| "(no identifier)".to_string());
        match site.base_url() {
            Some(url) => println!("  - {} ({})", id, url),
            None => println!("  - {}", id),
        }
    }
    ExitCode::SUCCESS
}

fn cmd_validate(settings: &Settings) -> ExitCode {
    let item_key = &settings.defaults.item_key;
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for (index, site) in settings.sites.iter().enumerate() {
        match site.identifier(item_key) {
            Some(id) => {
                if !seen.insert(id.clone()) {
                    problems.push(format!("duplicate site identifier '{}'", id));
                }
            }
            None => problems.push(format!(
                "site at position {} has no '{}' key",
                index, item_key
            )),
        }
    }

    if problems.is_empty() {
        println!("OK: {} site(s) configured", settings.sites.len());
        ExitCode::SUCCESS
    } else {
        eprintln!("Validation errors:");
        for problem in &problems {
            eprintln!("  {}", problem);
        }
        ExitCode::FAILURE
    }
}

/// Render a frame as a JSON array of row objects.
fn json_rows(frame: &Frame) -> String {
    let names = frame.names();
    let rows: Vec<serde_json::Value> = (0..frame.len())
        .map(|row| {
            names
                .iter()
                .map(|name| {
                    let cell = serde_json::to_value(frame.cell(name, row))
                        .unwrap_or(serde_json::Value::Null);
                    ((*name).to_string(), cell)
                })
                .collect::<serde_json::Map<String, serde_json::Value>>()
                .into()
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}
