use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{decode_rows, Backend, QueryError, SelectQuery};
use crate::models::{DailyDiagnostic, DailyLog, DailySummary, Mission, Profile, ReconciledLog};
use crate::profiles::{self, LookupError};

pub const MISSIONS_TABLE: &str = "missions";
pub const DAILY_LOGS_TABLE: &str = "daily_logs";

#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Joins each log to its mission. Output keeps log order, one entry per log.
pub fn join_logs(missions: &[Mission], logs: &[DailyLog]) -> Vec<ReconciledLog> {
    let titles: HashMap<&str, &str> = missions
        .iter()
        .map(|mission| (mission.id.as_str(), mission.title.as_str()))
        .collect();

    logs.iter()
        .map(|log| {
            let title = titles.get(log.mission_id.as_str()).copied();
            // untitled missions display their id too
            let display = title
                .filter(|t| !t.is_empty())
                .unwrap_or(log.mission_id.as_str());
            ReconciledLog {
                log_id: log.id.clone(),
                mission_id: log.mission_id.clone(),
                mission_title: display.to_string(),
                mission_found: title.is_some(),
                child_validated: log.child_validated,
                parent_validated: log.parent_validated,
                validation_requested: log.validation_requested,
                validation_result: log.validation_result.clone(),
            }
        })
        .collect()
}

pub fn summarize(logs: &[ReconciledLog]) -> DailySummary {
    let mut summary = DailySummary {
        total: logs.len(),
        ..DailySummary::default()
    };

    for log in logs {
        if log.child_validated {
            summary.child_validated += 1;
        }
        if log.parent_validated {
            summary.parent_validated += 1;
        }
        if log.validation_requested && !log.parent_validated {
            summary.pending_validation += 1;
        }
        if !log.mission_found {
            summary.missing_missions += 1;
        }
    }

    summary
}

pub async fn reconcile_daily_logs(
    backend: &dyn Backend,
    profile: &Profile,
    date: NaiveDate,
) -> Result<Vec<ReconciledLog>, QueryError> {
    let missions: Vec<Mission> = match &profile.family_id {
        Some(family_id) => {
            let rows = backend
                .select(&SelectQuery::new(MISSIONS_TABLE).eq("family_id", family_id))
                .await?;
            decode_rows(MISSIONS_TABLE, rows)?
        }
        None => {
            warn!(profile_id = %profile.id, "profile has no family; mission titles will fall back to ids");
            Vec::new()
        }
    };

    let rows = backend
        .select(
            &SelectQuery::new(DAILY_LOGS_TABLE)
                .eq("profile_id", &profile.id)
                .eq("date", date),
        )
        .await?;
    let logs: Vec<DailyLog> = decode_rows(DAILY_LOGS_TABLE, rows)?;

    info!(
        profile_id = %profile.id,
        %date,
        missions = missions.len(),
        logs = logs.len(),
        "reconciling daily logs"
    );

    Ok(join_logs(&missions, &logs))
}

/// Resolves the profile, then reconciles its logs for `date`. Nothing past
/// the profile lookup runs when no profile matches.
pub async fn run_daily_diagnostic(
    backend: &dyn Backend,
    fragment: &str,
    date: NaiveDate,
) -> Result<DailyDiagnostic, DiagnosticError> {
    let profile = profiles::find_profile_by_name_fragment(backend, fragment).await?;
    let logs = reconcile_daily_logs(backend, &profile, date).await?;
    let summary = summarize(&logs);

    Ok(DailyDiagnostic {
        profile,
        date,
        logs,
        summary,
    })
}
