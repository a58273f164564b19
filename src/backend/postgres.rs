use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row as _;
use tracing::debug;

use super::{Backend, Columns, QueryError, Row, SelectQuery};

/// Direct Postgres connection to the project database.
pub struct PgBackend {
    pool: PgPool,
    timeout_secs: u64,
}

impl PgBackend {
    pub async fn connect(database_url: &str, timeout_secs: u64) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect(database_url)
            .await
            .map_err(|err| map_sqlx_error("-", timeout_secs, err))?;

        Ok(Self { pool, timeout_secs })
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

/// Builds the SQL for a select. Each row comes back as one JSON object in
/// the `row` column. Filter values bind as text, one `$n` per filter.
pub fn build_sql(query: &SelectQuery) -> String {
    let columns = match &query.columns {
        Columns::All => "*".to_string(),
        Columns::Named(columns) => columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", "),
    };

    let mut inner = format!("SELECT {columns} FROM {}", quote(&query.table));

    for (idx, (column, _)) in query.filters.iter().enumerate() {
        inner.push_str(if idx == 0 { " WHERE " } else { " AND " });
        inner.push_str(&format!("{}::text = ${}", quote(column), idx + 1));
    }

    if let Some(limit) = query.limit {
        inner.push_str(&format!(" LIMIT {limit}"));
    }

    format!("SELECT row_to_json(t) AS row FROM ({inner}) t")
}

fn map_sqlx_error(table: &str, timeout_secs: u64, err: sqlx::Error) -> QueryError {
    match err {
        sqlx::Error::PoolTimedOut => QueryError::Timeout {
            table: table.to_string(),
            secs: timeout_secs,
        },
        sqlx::Error::Database(db) => QueryError::Rejected {
            table: table.to_string(),
            code: db
                .code()
                .map(|c| c.into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
            message: db.message().to_string(),
        },
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => QueryError::Decode {
            table: table.to_string(),
            message: err.to_string(),
        },
        other => QueryError::Transport {
            table: table.to_string(),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl Backend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
        query.validate()?;
        let sql = build_sql(query);
        debug!(table = %query.table, sql = %sql, "postgres select");

        let mut statement = sqlx::query(&sql);
        for (_, value) in &query.filters {
            statement = statement.bind(value.as_str());
        }

        let records = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            statement.fetch_all(&self.pool),
        )
        .await
        .map_err(|_| QueryError::Timeout {
            table: query.table.clone(),
            secs: self.timeout_secs,
        })?
        .map_err(|err| map_sqlx_error(&query.table, self.timeout_secs, err))?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let value: Value = record
                .try_get("row")
                .map_err(|err| map_sqlx_error(&query.table, self.timeout_secs, err))?;
            match value {
                Value::Object(map) => rows.push(map),
                other => {
                    return Err(QueryError::Decode {
                        table: query.table.clone(),
                        message: format!("expected a JSON object per row, got {other}"),
                    })
                }
            }
        }

        Ok(rows)
    }
}
