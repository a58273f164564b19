use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::config::BackendTarget;

pub mod postgres;
pub mod rest;

#[cfg(test)]
pub mod fake;

pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("query on {table} timed out after {secs}s")]
    Timeout { table: String, secs: u64 },

    #[error("query on {table} failed: {message}")]
    Transport { table: String, message: String },

    /// The server refused the query. `code` is the SQLSTATE when known,
    /// otherwise the HTTP status.
    #[error("{table} rejected the query ({code}): {message}")]
    Rejected {
        table: String,
        code: String,
        message: String,
    },

    #[error("could not decode rows from {table}: {message}")]
    Decode { table: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Columns,
    pub filters: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Columns::All,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Columns::Named(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rejects table or column names that are not plain identifiers.
    pub fn validate(&self) -> Result<(), QueryError> {
        validate_identifier(&self.table)?;
        if let Columns::Named(columns) = &self.columns {
            for column in columns {
                validate_identifier(column)?;
            }
        }
        for (column, _) in &self.filters {
            validate_identifier(column)?;
        }
        Ok(())
    }
}

pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(QueryError::InvalidIdentifier(name.to_string()))
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError>;
}

/// Opens the backend named by `target`. The handle is reused for the whole run.
pub async fn connect(target: &BackendTarget, timeout_secs: u64) -> Result<Box<dyn Backend>, QueryError> {
    match target {
        BackendTarget::Rest { url, anon_key } => {
            info!(url = %url, "using Supabase REST backend");
            Ok(Box::new(rest::RestBackend::new(url, anon_key, timeout_secs)?))
        }
        BackendTarget::Postgres { database_url } => {
            info!("using direct Postgres backend");
            Ok(Box::new(postgres::PgBackend::connect(database_url, timeout_secs).await?))
        }
    }
}

pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, QueryError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|err| QueryError::Decode {
                table: table.to_string(),
                message: err.to_string(),
            })
        })
        .collect()
}
