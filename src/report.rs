use std::fmt::Write;

use serde::Serialize;
use serde_json::Value;

use crate::models::{DailyDiagnostic, Profile, ReconciledLog, SampleOutcome, TableSample};

pub const DELIMITER: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn result_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn render_daily_text(diagnostic: &DailyDiagnostic) -> String {
    let mut output = String::new();
    let profile = &diagnostic.profile;

    let _ = writeln!(output, "Daily log report");
    let _ = writeln!(
        output,
        "Profile: {} ({}, {})",
        profile.display_name,
        profile.id,
        profile.role.as_str()
    );
    let _ = writeln!(
        output,
        "Family:  {}",
        profile.family_id.as_deref().unwrap_or("-")
    );
    let _ = writeln!(output, "Date:    {}", diagnostic.date);
    let _ = writeln!(output, "{DELIMITER}");

    if diagnostic.logs.is_empty() {
        let _ = writeln!(output, "No logs recorded for this date.");
        let _ = writeln!(output, "{DELIMITER}");
    }

    for log in &diagnostic.logs {
        write_log_block(&mut output, log);
        let _ = writeln!(output, "{DELIMITER}");
    }

    let summary = &diagnostic.summary;
    let _ = writeln!(
        output,
        "Summary: {} logs, {} child-validated, {} parent-validated, {} awaiting parent, {} unknown missions",
        summary.total,
        summary.child_validated,
        summary.parent_validated,
        summary.pending_validation,
        summary.missing_missions
    );

    output
}

fn write_log_block(output: &mut String, log: &ReconciledLog) {
    let _ = writeln!(output, "Log:                  {}", log.log_id);
    if log.mission_found {
        let _ = writeln!(output, "Mission:              {}", log.mission_title);
    } else {
        let _ = writeln!(
            output,
            "Mission:              {} (mission not found)",
            log.mission_title
        );
    }
    let _ = writeln!(output, "Child validated:      {}", yes_no(log.child_validated));
    let _ = writeln!(output, "Parent validated:     {}", yes_no(log.parent_validated));
    let _ = writeln!(
        output,
        "Validation requested: {}",
        yes_no(log.validation_requested)
    );
    let _ = writeln!(
        output,
        "Validation result:    {}",
        result_label(log.validation_result.as_ref())
    );
}

pub fn render_schema_text(samples: &[TableSample]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Schema probe ({} tables)", samples.len());
    let _ = writeln!(output, "{DELIMITER}");

    for sample in samples {
        let _ = writeln!(output, "Table: {}", sample.table);
        match &sample.outcome {
            SampleOutcome::Columns(columns) => {
                for column in columns {
                    let _ = writeln!(output, "  - {column}");
                }
            }
            SampleOutcome::Empty => {
                let _ = writeln!(output, "  (empty)");
            }
            SampleOutcome::Failed(message) => {
                let _ = writeln!(output, "  ERROR: {message}");
            }
        }
        let _ = writeln!(output, "{DELIMITER}");
    }

    output
}

pub fn render_profiles_text(profiles: &[Profile]) -> String {
    let mut output = String::new();

    if profiles.is_empty() {
        let _ = writeln!(output, "No profiles found.");
        return output;
    }

    let _ = writeln!(output, "Profiles ({}):", profiles.len());
    for profile in profiles {
        let _ = writeln!(
            output,
            "- {} [{}] id {} family {}",
            profile.display_name,
            profile.role.as_str(),
            profile.id,
            profile.family_id.as_deref().unwrap_or("-")
        );
    }

    output
}

#[derive(Serialize)]
struct DailyCsvRow<'a> {
    log_id: &'a str,
    mission_id: &'a str,
    mission_title: &'a str,
    mission_found: bool,
    child_validated: bool,
    parent_validated: bool,
    validation_requested: bool,
    validation_result: String,
}

#[derive(Serialize)]
struct SchemaCsvRow<'a> {
    table: &'a str,
    status: &'static str,
    columns: String,
    error: &'a str,
}

const DAILY_CSV_HEADER: &[&str] = &[
    "log_id",
    "mission_id",
    "mission_title",
    "mission_found",
    "child_validated",
    "parent_validated",
    "validation_requested",
    "validation_result",
];
const SCHEMA_CSV_HEADER: &[&str] = &["table", "status", "columns", "error"];
const PROFILES_CSV_HEADER: &[&str] = &["id", "display_name", "role", "family_id"];

/// Writes `header` first so an empty record set still yields column names.
fn write_csv<T: Serialize>(
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush csv output: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn render_daily(diagnostic: &DailyDiagnostic, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_daily_text(diagnostic)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(diagnostic)? + "\n"),
        OutputFormat::Csv => write_csv(DAILY_CSV_HEADER, diagnostic.logs.iter().map(|log| DailyCsvRow {
            log_id: &log.log_id,
            mission_id: &log.mission_id,
            mission_title: &log.mission_title,
            mission_found: log.mission_found,
            child_validated: log.child_validated,
            parent_validated: log.parent_validated,
            validation_requested: log.validation_requested,
            validation_result: result_label(log.validation_result.as_ref()),
        })),
    }
}

pub fn render_schema(samples: &[TableSample], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_schema_text(samples)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(samples)? + "\n"),
        OutputFormat::Csv => write_csv(SCHEMA_CSV_HEADER, samples.iter().map(|sample| match &sample.outcome {
            SampleOutcome::Columns(columns) => SchemaCsvRow {
                table: &sample.table,
                status: "columns",
                columns: columns.join(";"),
                error: "",
            },
            SampleOutcome::Empty => SchemaCsvRow {
                table: &sample.table,
                status: "empty",
                columns: String::new(),
                error: "",
            },
            SampleOutcome::Failed(message) => SchemaCsvRow {
                table: &sample.table,
                status: "failed",
                columns: String::new(),
                error: message,
            },
        })),
    }
}

pub fn render_profiles(profiles: &[Profile], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_profiles_text(profiles)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(profiles)? + "\n"),
        OutputFormat::Csv => write_csv(PROFILES_CSV_HEADER, profiles),
    }
}
