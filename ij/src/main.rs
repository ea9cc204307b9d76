//! ij - run injector scenarios from the command line

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use injector::InjectorConfig;
use injector::cli::{Cli, Command, OutputFormat};
use injector::scenario::{Scenario, ScenarioRunner, TraceEntry};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > WARN
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") => tracing::Level::INFO,
        Some("ERROR") => tracing::Level::ERROR,
        Some("WARN") | Some("WARNING") | None => tracing::Level::WARN,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", other);
            tracing::Level::WARN
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("{}", e))?;

    debug!(?level, "Logging initialized");
    Ok(())
}

fn print_text(entry: &TraceEntry) {
    match entry {
        TraceEntry::Event { event, name, value } => {
            println!("{} {} = {}", event.cyan(), name.bold(), value);
        }
        TraceEntry::Fired { label, values } => {
            let values: Vec<String> = values
                .iter()
                .map(|v| v.clone().unwrap_or_else(|| "<missing>".to_string()))
                .collect();
            println!("{} {} ({})", "✓".green(), label.bold(), values.join(", "));
        }
        TraceEntry::Skipped { label } => {
            println!("{} {} skipped", "-".yellow(), label.bold());
        }
        TraceEntry::Settled { turns } => {
            println!("{}", format!("settled {} turn(s)", turns).dimmed());
        }
        TraceEntry::Unfulfilled { pending: None } => {
            println!("{}", "nothing pending".dimmed());
        }
        TraceEntry::Unfulfilled { pending: Some(pending) } => {
            for item in pending {
                println!("{} {} ({} waiting)", "…".yellow(), item.name, item.waiters);
            }
        }
        TraceEntry::Rejected { step, error } => {
            println!("{} step {}: {}", "✗".red(), step, error);
        }
    }
}

fn cmd_run(config: InjectorConfig, path: &std::path::Path, format: OutputFormat) -> Result<()> {
    let scenario = Scenario::load(path)?;
    if let Some(description) = &scenario.description {
        info!(%description, "Running scenario");
    }

    let runner = ScenarioRunner::new(config).context("Invalid injector configuration")?;
    let trace = runner.run(&scenario);

    match format {
        OutputFormat::Text => trace.iter().for_each(print_text),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trace)?),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = InjectorConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    match cli.command {
        Command::Run { scenario, format } => cmd_run(config, &scenario, format),
        Command::Config => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}
