use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::models::{ReportConfig, ReportData, ReportFormat, ReportResult};
use crate::service::{
    load_document, BatchItem, DirectoryLookup, ReportRequest, ReportService, ReportSettings,
};

/// creport - compliance report synthesis
#[derive(Parser, Debug)]
#[command(name = "creport")]
#[command(version)]
#[command(about = "Generate compliance analysis reports as PDF, HTML or JSON")]
pub struct Cli {
    /// Settings file (TOML); defaults to the user config directory
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Override the report output directory
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a report from a JSON or YAML report-data file
    Generate {
        /// Report data: analysis results plus title and author
        input: PathBuf,
        /// Report configuration file (JSON or YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output format: pdf, html or json
        #[arg(long)]
        format: Option<String>,
        /// Template name, resolved in the template directory
        #[arg(long)]
        template: Option<String>,
        /// Skip clustering
        #[arg(long)]
        no_clustering: bool,
    },
    /// Generate several reports from stored analyses
    Batch {
        /// List of report requests (JSON or YAML)
        requests: PathBuf,
        /// Directory holding `{analysis_id}.json` files
        #[arg(long)]
        analyses: PathBuf,
    },
    /// List recent PDF reports
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show a report by id
    Show {
        report_id: String,
        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a report and its generated assets
    Delete { report_id: String },
    /// Print the effective settings as TOML
    Settings {
        /// Save them to the settings file instead
        #[arg(long)]
        write: bool,
    },
}

/// Install the fmt subscriber; DEBUG when verbose, INFO otherwise
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(&cli)?;
    if let Commands::Settings { write } = cli.command {
        if write {
            let path = write_settings(cli.settings.as_deref(), &settings)?;
            println!("💾 Settings written to {}", path.display());
            return Ok(());
        }
        return show_settings(&settings);
    }

    let service = ReportService::new(settings).context("Failed to initialize report service")?;

    match cli.command {
        Commands::Generate {
            input,
            config,
            format,
            template,
            no_clustering,
        } => {
            let config = build_config(config.as_deref(), format.as_deref(), template, no_clustering)?;
            generate_report(&service, &input, &config)
        }
        Commands::Batch { requests, analyses } => generate_batch(&service, &requests, &analyses),
        Commands::List { limit } => list_reports(&service, limit),
        Commands::Show { report_id, json } => show_report(&service, &report_id, json),
        Commands::Delete { report_id } => delete_report(&service, &report_id),
        Commands::Settings { .. } => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> Result<ReportSettings> {
    let mut settings = ReportSettings::load_or_default(cli.settings.as_deref())?;
    if let Some(output_dir) = &cli.output_dir {
        settings.output_dir = output_dir.clone();
    }
    Ok(settings)
}

/// Merge a config file with command-line overrides
pub fn build_config(
    path: Option<&Path>,
    format: Option<&str>,
    template: Option<String>,
    no_clustering: bool,
) -> Result<ReportConfig> {
    let mut config = match path {
        Some(path) => load_document::<ReportConfig>(path)?,
        None => ReportConfig::default(),
    };

    if let Some(format) = format {
        config.format = format.parse::<ReportFormat>()?;
    }
    if let Some(template) = template {
        config.template_name = template;
    }
    if no_clustering {
        config.include_clustering = false;
    }

    Ok(config)
}

fn generate_report(service: &ReportService, input: &Path, config: &ReportConfig) -> Result<()> {
    println!("📝 Generating {} report from {}...", config.format, input.display());

    let data: ReportData = load_document(input)?;
    let result = service.generate(config, &data)?;

    println!("✅ Report generated");
    print_report(&result);
    Ok(())
}

fn generate_batch(service: &ReportService, requests: &Path, analyses: &Path) -> Result<()> {
    let requests: Vec<ReportRequest> = load_document(requests)?;
    println!("📦 Generating {} report(s)...", requests.len());

    let lookup = DirectoryLookup::new(analyses);
    let outcome = service.generate_batch(&requests, &lookup);

    for item in &outcome.items {
        match item {
            BatchItem::Completed { index, report } => {
                println!("  ✅ #{} {} → {}", index + 1, report.report_id, report.file_path.display());
            }
            BatchItem::Failed { index, error } => {
                println!("  ❌ #{} {}", index + 1, error);
            }
        }
    }

    println!();
    println!("📊 {} completed, {} failed", outcome.completed(), outcome.failed());
    Ok(())
}

fn list_reports(service: &ReportService, limit: usize) -> Result<()> {
    let reports = service.list(limit);
    if reports.is_empty() {
        println!("📭 No reports found in {}", service.store().output_dir().display());
        return Ok(());
    }

    println!("📋 {} most recent report(s):", reports.len());
    for report in &reports {
        let modified = report
            .metadata
            .as_ref()
            .and_then(|m| m.get("modified_at"))
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        println!("  📄 {}  {} bytes  {}", report.report_id, report.file_size, modified);
    }
    Ok(())
}

fn show_report(service: &ReportService, report_id: &str, json: bool) -> Result<()> {
    let Some(report) = service.get(report_id) else {
        println!("❌ Report not found: {}", report_id);
        return Ok(());
    };

    if json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn delete_report(service: &ReportService, report_id: &str) -> Result<()> {
    if service.delete(report_id)? {
        println!("🗑️  Deleted report {}", report_id);
    } else {
        println!("❌ Report not found: {}", report_id);
    }
    Ok(())
}

fn show_settings(settings: &ReportSettings) -> Result<()> {
    let toml = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    println!("{}", toml);
    Ok(())
}

/// Save settings to `path`, or the default settings location
pub fn write_settings(path: Option<&Path>, settings: &ReportSettings) -> Result<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(ReportSettings::default_path)
        .context("No settings location available; pass --settings")?;
    settings.save(&path)?;
    Ok(path)
}

fn print_report(report: &ReportResult) {
    println!("  🆔 {}", report.report_id);
    println!("  📁 {}", report.file_path.display());
    println!("  📏 {} bytes ({})", report.file_size, report.format);
    if report.generation_time > 0.0 {
        println!("  ⏱️  {:.2}s using template '{}'", report.generation_time, report.template_used);
    }
    if let Some(pages) = report.page_count {
        println!("  📄 ~{} page(s)", pages);
    }
    if let Some(checksum) = report
        .metadata
        .as_ref()
        .and_then(|m| m.get("checksum_sha256"))
        .and_then(|v| v.as_str())
    {
        println!("  🔒 sha256 {}", checksum);
    }
}
