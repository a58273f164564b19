use chrono::NaiveDate;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Parent,
    Child,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Child => "child",
            Role::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub display_name: String,
    #[serde(default = "default_role", deserialize_with = "de_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub family_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub family_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLog {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub profile_id: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub mission_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "de_flag")]
    pub child_validated: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub parent_validated: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub validation_requested: bool,
    #[serde(default)]
    pub validation_result: Option<Value>,
}

/// One daily log joined to the mission it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledLog {
    pub log_id: String,
    pub mission_id: String,
    /// Mission title, or the raw mission id when the mission was not fetched.
    pub mission_title: String,
    pub mission_found: bool,
    pub child_validated: bool,
    pub parent_validated: bool,
    pub validation_requested: bool,
    pub validation_result: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    pub total: usize,
    pub child_validated: usize,
    pub parent_validated: usize,
    pub pending_validation: usize,
    pub missing_missions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDiagnostic {
    pub profile: Profile,
    pub date: NaiveDate,
    pub logs: Vec<ReconciledLog>,
    pub summary: DailySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum SampleOutcome {
    Columns(Vec<String>),
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSample {
    pub table: String,
    pub outcome: SampleOutcome,
}

fn default_role() -> Role {
    Role::Other
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or numeric id, got {other}"
        ))),
    }
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!(
            "expected string or numeric id, got {other}"
        ))),
    }
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn de_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("parent") => Role::Parent,
        Some("child") => Role::Child,
        _ => Role::Other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_accepts_numeric_ids() {
        let profile: Profile = serde_json::from_value(json!({
            "id": 1,
            "display_name": "Marie Curie",
            "role": "Child",
            "family_id": 42
        }))
        .unwrap();

        assert_eq!(profile.id, "1");
        assert_eq!(profile.role, Role::Child);
        assert_eq!(profile.family_id.as_deref(), Some("42"));
    }

    #[test]
    fn unknown_or_missing_role_is_other() {
        let profile: Profile =
            serde_json::from_value(json!({"id": "p1", "display_name": "Jean", "role": null}))
                .unwrap();
        assert_eq!(profile.role, Role::Other);
        assert_eq!(profile.family_id, None);
    }

    #[test]
    fn log_flags_default_to_false() {
        let log: DailyLog = serde_json::from_value(json!({
            "id": "l1",
            "profile_id": "p1",
            "mission_id": "m1",
            "date": "2026-03-14",
            "child_validated": true,
            "parent_validated": null
        }))
        .unwrap();

        assert!(log.child_validated);
        assert!(!log.parent_validated);
        assert!(!log.validation_requested);
        assert_eq!(log.validation_result, None);
        assert_eq!(log.date, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn null_text_columns_decode_as_empty() {
        let profile: Profile =
            serde_json::from_value(json!({"id": "p1", "display_name": null})).unwrap();
        assert_eq!(profile.display_name, "");

        let mission: Mission = serde_json::from_value(json!({"id": "m1", "title": null})).unwrap();
        assert_eq!(mission.title, "");
    }

    #[test]
    fn log_without_mission_id_is_rejected() {
        let result: Result<DailyLog, _> =
            serde_json::from_value(json!({"id": "l1", "date": "2026-03-14"}));
        assert!(result.is_err());
    }
}
