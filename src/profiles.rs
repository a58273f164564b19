use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{decode_rows, Backend, QueryError, SelectQuery};
use crate::models::Profile;

pub const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no profile name contains {fragment:?}")]
    NotFound { fragment: String },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// First profile whose display name contains `fragment`, ignoring case.
pub fn match_profile<'a>(profiles: &'a [Profile], fragment: &str) -> Option<&'a Profile> {
    let needle = fragment.to_lowercase();
    profiles
        .iter()
        .find(|profile| profile.display_name.to_lowercase().contains(&needle))
}

pub async fn list_profiles(backend: &dyn Backend) -> Result<Vec<Profile>, QueryError> {
    let rows = backend
        .select(&SelectQuery::new(PROFILES_TABLE).columns(["id", "display_name", "role", "family_id"]))
        .await?;
    debug!(rows = rows.len(), "fetched profiles");
    decode_rows(PROFILES_TABLE, rows)
}

/// Loads every profile and returns the first one matching `fragment`.
///
/// Match order is whatever order the backend returns rows in, which is not
/// guaranteed to be stable between runs.
pub async fn find_profile_by_name_fragment(
    backend: &dyn Backend,
    fragment: &str,
) -> Result<Profile, LookupError> {
    let rows = backend.select(&SelectQuery::new(PROFILES_TABLE)).await?;
    let profiles: Vec<Profile> = decode_rows(PROFILES_TABLE, rows)?;

    match match_profile(&profiles, fragment) {
        Some(profile) => {
            info!(profile_id = %profile.id, name = %profile.display_name, "resolved profile");
            Ok(profile.clone())
        }
        None => Err(LookupError::NotFound {
            fragment: fragment.to_string(),
        }),
    }
}
