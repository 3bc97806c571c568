use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use serde::Serialize;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ibisgate_core::{Config, ModelType, RecordStatus, Report, Severity};
use ibisgate_engine::{ClassificationRule, Pipeline, RequiredData, RuleRegistry, ThresholdPolicy};

mod input;

/// ibisgate - Buffer model classification and validation for IBIS generation
#[derive(Parser)]
#[command(name = "ibisgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ibisgate.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify and validate model records
    Check {
        /// JSON record files or directories to walk
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Process records one at a time instead of on the thread pool
        #[arg(long)]
        sequential: bool,
    },

    /// Show the model type rule table
    Rules {
        /// Print the rules as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    InitConfig {
        /// Where to write the config
        #[arg(default_value = "ibisgate.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Exit status when every record was finalized
const EXIT_OK: u8 = 0;
/// Exit status when at least one record was rejected
const EXIT_REJECTED: u8 = 1;
/// Exit status when at least one record has an unrecognized model type
const EXIT_UNCLASSIFIED: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new("ibisgate.toml").exists() {
        Config::from_file(Path::new("ibisgate.toml")).context("Failed to load ibisgate.toml")?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match cli.command {
        Commands::Check { inputs, output, markdown, sequential } => {
            check_command(&config, &inputs, &output, markdown.as_deref(), sequential, cli.verbose)
        }
        Commands::Rules { json } => {
            rules_command(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::InitConfig { path, force } => {
            init_config_command(&path, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Check command - run every record through the pipeline
fn check_command(
    config: &Config,
    inputs: &[PathBuf],
    output: &Path,
    markdown: Option<&Path>,
    sequential: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let records = input::load_records(inputs)?;

    if verbose {
        eprintln!("{} {} records", "Checking".cyan(), records.len());
    }

    let registry = RuleRegistry::from_config(config);
    let mut pipeline = Pipeline::with_config(&registry, config);
    if sequential {
        pipeline = pipeline.parallel(false);
    }

    let mut report = pipeline.check(records);
    report.metadata = Some(report_metadata(config, inputs)?);

    report.save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        let md = generate_markdown_report(&report);
        std::fs::write(md_path, md)
            .with_context(|| format!("Failed to write markdown report to {}", md_path.display()))?;

        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    Ok(ExitCode::from(exit_status(&report)))
}

/// Run context recorded in the report
fn report_metadata(config: &Config, inputs: &[PathBuf]) -> Result<serde_json::Value> {
    let inputs: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();

    Ok(serde_json::json!({
        "tool_version": env!("CARGO_PKG_VERSION"),
        "inputs": inputs,
        "config": serde_json::to_value(config)?,
    }))
}

fn exit_status(report: &Report) -> u8 {
    if report.has_unclassified() {
        EXIT_UNCLASSIFIED
    } else if report.has_rejections() {
        EXIT_REJECTED
    } else {
        EXIT_OK
    }
}

/// One row of `rules --json`
#[derive(Serialize)]
struct RuleEntry<'a> {
    model_type: ModelType,
    #[serde(flatten)]
    rule: &'a ClassificationRule,
}

fn rules_json(registry: &RuleRegistry) -> Result<String> {
    let entries: Vec<RuleEntry> = registry
        .entries()
        .map(|(model_type, rule)| RuleEntry { model_type, rule })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Rules command - print the registry
fn rules_command(config: &Config, json: bool) -> Result<()> {
    let registry = RuleRegistry::from_config(config);

    if json {
        println!("{}", rules_json(&registry)?);
        return Ok(());
    }

    println!("{}", "Model Type Rules".bold().bright_blue());
    println!();

    for (model_type, rule) in registry.entries() {
        println!(
            "{:<14} {} {}",
            model_type.tag().bold(),
            format!("[{}]", rule.group.letter()).cyan(),
            rule.group.description()
        );
        println!("    thresholds: {}", describe_thresholds(rule));
        println!("    requires:   {}", describe_required(rule.required_data));

        let allowed: Vec<&str> = rule.allowed_sections.iter().map(|s| s.as_str()).collect();
        println!("    allowed:    {}", allowed.join(", "));

        if let Some(section) = rule.suppressed_section {
            println!("    suppressed: {}", section.as_str().yellow());
        }
    }

    Ok(())
}

fn describe_thresholds(rule: &ClassificationRule) -> String {
    match rule.thresholds {
        ThresholdPolicy::Required { default_vinl, default_vinh } => {
            format!("required (defaults vinl={} V, vinh={} V)", default_vinl, default_vinh)
        }
        ThresholdPolicy::NotApplicable => "not applicable (dropped)".to_string(),
        ThresholdPolicy::Forbidden => "forbidden".to_string(),
        ThresholdPolicy::ConverterOnly => "on external model converters only".to_string(),
    }
}

fn describe_required(required: RequiredData) -> &'static str {
    match required {
        RequiredData::Nothing => "-",
        RequiredData::PullTable => "pull-up or pull-down table",
        RequiredData::SeriesElement => "series element",
        RequiredData::ExternalModel => "external model reference",
    }
}

/// Init-config command - write the default config
fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Buffer Model Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    let summary = &report.summary;
    println!("{}", "Summary:".bold());
    println!("  Records:      {}", summary.records_checked + summary.unclassified);
    println!("  Finalized:    {}", summary.finalized.to_string().green());

    if summary.rejected > 0 {
        println!("  Rejected:     {}", summary.rejected.to_string().red().bold());
    } else {
        println!("  Rejected:     {}", summary.rejected.to_string().green());
    }

    if summary.unclassified > 0 {
        println!("  Unclassified: {}", summary.unclassified.to_string().red().bold());
    }

    println!("  Errors:       {}", summary.errors);
    println!("  Warnings:     {}", summary.warnings);
    println!();

    for record in &report.records {
        if record.diagnostics.is_empty() {
            continue;
        }

        let status = match record.status {
            RecordStatus::Finalized => "FINALIZED".green().bold(),
            _ => "REJECTED".red().bold(),
        };
        println!("  [{}] {} ({})", status, record.name, record.model_type);

        for diag in &record.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warning => "WARN".yellow().bold(),
            };

            print!("    [{}] {}: {}", severity_str, diag.code, diag.message);
            if let Some(field) = &diag.field {
                print!(" ({})", field);
            }
            println!();
        }
    }

    for record in &report.unclassified {
        println!("  [{}] {}: {}", "UNKNOWN".red().bold(), record.name, record.error);
    }

    if report.records.iter().all(|r| r.diagnostics.is_empty()) && report.unclassified.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Buffer Model Check Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    let summary = &report.summary;
    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Records checked: {}\n", summary.records_checked));
    md.push_str(&format!("- Finalized: {}\n", summary.finalized));
    md.push_str(&format!("- Rejected: {}\n", summary.rejected));
    md.push_str(&format!("- Unclassified: {}\n", summary.unclassified));
    md.push_str(&format!("- Errors: {}\n", summary.errors));
    md.push_str(&format!("- Warnings: {}\n", summary.warnings));
    md.push('\n');

    md.push_str("## Records\n\n");
    md.push_str("| Model | Type | Status | Rejected at |\n");
    md.push_str("|-------|------|--------|-------------|\n");
    for record in &report.records {
        let stage = record.rejected_at.map(|s| s.to_string()).unwrap_or_default();
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            record.name, record.model_type, record.status, stage
        ));
    }
    md.push('\n');

    if report.diagnostics().next().is_none() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for record in report.records.iter().filter(|r| !r.diagnostics.is_empty()) {
            md.push_str(&format!("### {} ({})\n\n", record.name, record.model_type));

            for diag in &record.diagnostics {
                let severity_emoji = match diag.severity {
                    Severity::Error => "❌",
                    Severity::Warning => "⚠️",
                };

                md.push_str(&format!("- {} `{}` {}", severity_emoji, diag.code, diag.message));
                if let Some(field) = &diag.field {
                    md.push_str(&format!(" (**Field:** `{}`)", field));
                }
                md.push('\n');
            }
            md.push('\n');
        }
    }

    if !report.unclassified.is_empty() {
        md.push_str("## Unclassified\n\n");
        for record in &report.unclassified {
            md.push_str(&format!("- **{}** (`{}`): {}\n", record.name, record.model_type, record.error));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibisgate_core::{IvTable, ModelRecord, TestLoad};

    fn finalized_record() -> ModelRecord {
        ModelRecord::new("OUT", "Output")
            .with_pulldown(IvTable::from_pairs(&[(0.0, 0.0), (3.3, 0.05)]))
            .with_test_load(TestLoad::new(50.0, 0.0, 0.0))
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_status_priorities() {
        let pipeline = Pipeline::builtin();

        let clean = pipeline.check(vec![finalized_record()]);
        assert_eq!(exit_status(&clean), EXIT_OK);

        let rejected = pipeline.check(vec![finalized_record(), ModelRecord::new("S", "Series")]);
        assert_eq!(exit_status(&rejected), EXIT_REJECTED);

        let unknown = pipeline.check(vec![ModelRecord::new("S", "Series"), ModelRecord::new("X", "Bogus")]);
        assert_eq!(exit_status(&unknown), EXIT_UNCLASSIFIED);
    }

    #[test]
    fn markdown_lists_records_and_diagnostics() {
        let report = Pipeline::builtin().check(vec![
            finalized_record(),
            ModelRecord::new("SER", "Series_switch"),
            ModelRecord::new("X", "Bogus"),
        ]);

        let md = generate_markdown_report(&report);
        assert!(md.contains("| OUT | Output | finalized |  |"));
        assert!(md.contains("| SER | Series_switch | rejected | validate |"));
        assert!(md.contains("`missing-series-data`"));
        assert!(md.contains("## Unclassified"));
        assert!(md.contains("unknown model type 'Bogus'"));
    }

    #[test]
    fn markdown_clean_report() {
        let report = Pipeline::builtin().check(vec![finalized_record()]);
        let md = generate_markdown_report(&report);
        assert!(md.contains("No issues found"));
        assert!(!md.contains("## Unclassified"));
    }

    #[test]
    fn init_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ibisgate.toml");

        init_config_command(&path, false).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());

        assert!(init_config_command(&path, false).is_err());
        init_config_command(&path, true).unwrap();
    }

    #[test]
    fn rules_json_lists_every_type() {
        let json = rules_json(&RuleRegistry::default()).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(entries.len(), 19);

        let terminator = entries
            .iter()
            .find(|e| e["model_type"] == "Terminator")
            .unwrap();
        assert_eq!(terminator["group"], "Terminator");
        assert_eq!(terminator["thresholds"]["policy"], "forbidden");
        assert_eq!(terminator["required_data"], "nothing");
        assert_eq!(
            terminator["allowed_sections"],
            serde_json::json!(["gnd_clamp", "power_clamp", "external_model"])
        );

        let input = entries.iter().find(|e| e["model_type"] == "Input").unwrap();
        assert_eq!(input["thresholds"]["policy"], "required");
        assert_eq!(input["thresholds"]["default_vinh"], 2.0);

        let open_drain = entries.iter().find(|e| e["model_type"] == "Open_drain").unwrap();
        assert_eq!(open_drain["suppressed_section"], "pullup");
    }

    #[test]
    fn report_metadata_records_config_and_inputs() {
        let mut config = Config::default();
        config.pipeline.parallel = false;

        let metadata = report_metadata(&config, &[PathBuf::from("models/io.json")]).unwrap();

        assert_eq!(metadata["inputs"], serde_json::json!(["models/io.json"]));
        assert_eq!(metadata["config"]["pipeline"]["parallel"], false);
        assert_eq!(metadata["config"]["pipeline"]["suppressed_sections"], "zero");
        assert_eq!(metadata["config"]["thresholds"]["default_vinl"], 0.8);
        assert_eq!(metadata["tool_version"], env!("CARGO_PKG_VERSION"));

        let mut report = Pipeline::builtin().check(vec![finalized_record()]);
        report.metadata = Some(metadata.clone());
        let parsed: Report = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(parsed.metadata, Some(metadata));
    }

    #[test]
    fn threshold_descriptions() {
        let registry = RuleRegistry::default();
        let input = registry.lookup("Input").unwrap();
        assert_eq!(describe_thresholds(input), "required (defaults vinl=0.8 V, vinh=2 V)");

        let diff = registry.lookup("IO_diff").unwrap();
        assert_eq!(describe_thresholds(diff), "on external model converters only");
    }
}
