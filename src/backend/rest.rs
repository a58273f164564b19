use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{Backend, Columns, QueryError, Row, SelectQuery};

/// PostgREST client for a Supabase project (`{url}/rest/v1/{table}`).
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    hint: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| QueryError::Transport {
                table: "-".to_string(),
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

/// Translates a select into PostgREST query-string pairs.
pub fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
    let select = match &query.columns {
        Columns::All => "*".to_string(),
        Columns::Named(columns) => columns.join(","),
    };

    let mut params = vec![("select".to_string(), select)];
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{value}")));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

/// Returns the (code, message) pair for a failed request, preferring the
/// SQLSTATE and message from a PostgREST error body.
fn rejection(status: reqwest::StatusCode, body: &str) -> (String, String) {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(PostgrestError {
            code,
            message: Some(message),
            hint,
        }) => {
            let code = code.unwrap_or_else(|| status.as_u16().to_string());
            let message = match hint {
                Some(hint) if !hint.is_empty() => format!("{message} (hint: {hint})"),
                _ => message,
            };
            (code, message)
        }
        _ => (status.as_u16().to_string(), body.trim().to_string()),
    }
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
        query.validate()?;
        let table = query.table.clone();
        debug!(table = %table, filters = query.filters.len(), "rest select");

        let resp = self
            .client
            .get(self.table_url(&table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&query_params(query))
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    QueryError::Timeout {
                        table: table.clone(),
                        secs: self.timeout_secs,
                    }
                } else {
                    QueryError::Transport {
                        table: table.clone(),
                        message: err.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let (code, message) = rejection(status, &body);
            return Err(QueryError::Rejected {
                table,
                code,
                message,
            });
        }

        resp.json::<Vec<Row>>().await.map_err(|err| {
            if err.is_timeout() {
                QueryError::Timeout {
                    table: table.clone(),
                    secs: self.timeout_secs,
                }
            } else {
                QueryError::Decode {
                    table: table.clone(),
                    message: err.to_string(),
                }
            }
        })
    }
}
