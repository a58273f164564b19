use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Backend, Columns, QueryError, Row, SelectQuery};

/// In-memory backend serving canned rows per table.
#[derive(Default)]
pub struct FakeBackend {
    tables: HashMap<String, Vec<Row>>,
    failing: HashSet<String>,
    queries: Mutex<Vec<SelectQuery>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(table.to_string(), rows);
        self
    }

    pub fn failing(mut self, table: &str) -> Self {
        self.failing.insert(table.to_string());
        self
    }

    pub fn queries(&self) -> Vec<SelectQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn queried_tables(&self) -> Vec<String> {
        self.queries().into_iter().map(|q| q.table).collect()
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn select(&self, query: &SelectQuery) -> Result<Vec<Row>, QueryError> {
        self.queries.lock().unwrap().push(query.clone());
        query.validate()?;

        if self.failing.contains(&query.table) {
            return Err(QueryError::Rejected {
                table: query.table.clone(),
                code: "42P01".to_string(),
                message: format!("relation \"public.{}\" does not exist", query.table),
            });
        }

        let Some(rows) = self.tables.get(&query.table) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Row> = rows
            .iter()
            .filter(|row| {
                query.filters.iter().all(|(column, expected)| {
                    row.get(column).and_then(cell_text).as_deref() == Some(expected.as_str())
                })
            })
            .cloned()
            .collect();

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        if let Columns::Named(columns) = &query.columns {
            for row in matched.iter_mut() {
                row.retain(|key, _| columns.iter().any(|c| c == key));
            }
        }

        Ok(matched)
    }
}
