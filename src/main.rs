use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use tracing::info;

mod backend;
mod config;
mod logging;
mod models;
mod probe;
mod profiles;
mod reconcile;
mod report;

use config::{BackendKind, Settings};
use report::OutputFormat;

#[derive(Parser)]
#[command(name = "family-diagnostics")]
#[command(about = "Read-only diagnostics for the family missions database", long_about = None)]
struct Cli {
    /// Which backend to query; `auto` prefers the REST API when configured
    #[arg(long, value_enum, default_value_t = BackendKind::Auto, global = true)]
    backend: BackendKind,
    /// Per-query timeout in seconds (overrides DIAG_TIMEOUT_SECS)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout
    #[arg(long, global = true)]
    out: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a child's daily logs against the family's missions
    DailyLog {
        /// Case-insensitive fragment of the profile's display name
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        name: String,
        /// Day to inspect (YYYY-MM-DD); defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Sample one row per table and list its columns
    Schema {
        #[arg(long = "table")]
        tables: Vec<String>,
    },
    /// List every profile
    Profiles,
}

fn emit(out: Option<&PathBuf>, report: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, report)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{report}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing(logging::DEFAULT_FILTER)?;
    let cli = Cli::parse();

    let settings = Settings::from_env().context("invalid configuration")?;
    let timeout_secs = cli.timeout_secs.unwrap_or(settings.timeout_secs);
    let target = settings.target(cli.backend)?;
    let backend = backend::connect(&target, timeout_secs)
        .await
        .context("failed to open backend connection")?;

    match cli.command {
        Commands::DailyLog { name, date } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let diagnostic = reconcile::run_daily_diagnostic(backend.as_ref(), &name, date)
                .await
                .with_context(|| format!("daily log diagnostic for {name:?} on {date} failed"))?;
            let report = report::render_daily(&diagnostic, cli.format)?;
            emit(cli.out.as_ref(), &report)?;
        }
        Commands::Schema { tables } => {
            let tables = if tables.is_empty() {
                probe::default_tables()
            } else {
                tables
            };
            let samples = probe::probe_schema(backend.as_ref(), &tables).await;
            let report = report::render_schema(&samples, cli.format)?;
            emit(cli.out.as_ref(), &report)?;
        }
        Commands::Profiles => {
            let profiles = profiles::list_profiles(backend.as_ref())
                .await
                .context("failed to list profiles")?;
            let report = report::render_profiles(&profiles, cli.format)?;
            emit(cli.out.as_ref(), &report)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn daily_log_parses_date_and_global_flags() {
        let cli = Cli::try_parse_from([
            "family-diagnostics",
            "daily-log",
            "--name",
            "marie",
            "--date",
            "2026-03-14",
            "--format",
            "json",
            "--backend",
            "postgres",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.backend, BackendKind::Postgres);
        match cli.command {
            Commands::DailyLog { name, date } => {
                assert_eq!(name, "marie");
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 14));
            }
            _ => panic!("expected daily-log"),
        }
    }

    #[test]
    fn schema_accepts_repeated_tables() {
        let cli = Cli::try_parse_from([
            "family-diagnostics",
            "schema",
            "--table",
            "families",
            "--table",
            "ghost_table",
        ])
        .unwrap();

        match cli.command {
            Commands::Schema { tables } => assert_eq!(tables, vec!["families", "ghost_table"]),
            _ => panic!("expected schema"),
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = Cli::try_parse_from(["family-diagnostics", "--timeout-secs", "0", "profiles"]);
        assert!(result.is_err());

        let cli =
            Cli::try_parse_from(["family-diagnostics", "--timeout-secs", "5", "profiles"]).unwrap();
        assert_eq!(cli.timeout_secs, Some(5));
    }

    #[test]
    fn empty_name_is_rejected_but_whitespace_is_kept() {
        let result = Cli::try_parse_from(["family-diagnostics", "daily-log", "--name", ""]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["family-diagnostics", "daily-log", "--name", "e "]).unwrap();
        match cli.command {
            Commands::DailyLog { name, .. } => assert_eq!(name, "e "),
            _ => panic!("expected daily-log"),
        }
    }

    #[test]
    fn malformed_date_is_rejected() {
        let result = Cli::try_parse_from([
            "family-diagnostics",
            "daily-log",
            "--name",
            "marie",
            "--date",
            "14/03/2026",
        ]);
        assert!(result.is_err());
    }
}
