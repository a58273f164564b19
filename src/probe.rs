use tracing::{info, warn};

use crate::backend::{Backend, SelectQuery};
use crate::models::{SampleOutcome, TableSample};

pub const DEFAULT_TABLES: &[&str] = &["families", "profiles", "missions", "daily_logs", "rewards"];

pub fn default_tables() -> Vec<String> {
    DEFAULT_TABLES.iter().map(|t| t.to_string()).collect()
}

pub async fn probe_table(backend: &dyn Backend, table: &str) -> TableSample {
    let outcome = match backend.select(&SelectQuery::new(table).limit(1)).await {
        Ok(rows) => match rows.into_iter().next() {
            Some(row) => {
                let mut columns: Vec<String> = row.into_iter().map(|(key, _)| key).collect();
                columns.sort();
                SampleOutcome::Columns(columns)
            }
            None => SampleOutcome::Empty,
        },
        Err(err) => {
            warn!(table, error = %err, "probe failed; continuing");
            SampleOutcome::Failed(err.to_string())
        }
    };

    TableSample {
        table: table.to_string(),
        outcome,
    }
}

/// Samples one row per table, in input order. A failing table produces a
/// `Failed` sample and the batch carries on.
pub async fn probe_schema(backend: &dyn Backend, tables: &[String]) -> Vec<TableSample> {
    let mut samples = Vec::with_capacity(tables.len());
    for table in tables {
        samples.push(probe_table(backend, table).await);
    }

    let failed = samples
        .iter()
        .filter(|s| matches!(s.outcome, SampleOutcome::Failed(_)))
        .count();
    info!(tables = samples.len(), failed, backend = backend.name(), "schema probe finished");
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use serde_json::json;

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    fn backend() -> FakeBackend {
        FakeBackend::new()
            .with_rows(
                "families",
                vec![
                    json!({"name": "Curie", "id": "f1", "created_at": "2026-01-01T00:00:00Z"}),
                    json!({"name": "Dupont", "id": "f2", "created_at": "2026-01-02T00:00:00Z"}),
                ],
            )
            .with_rows("rewards", vec![])
            .failing("ghost_table")
    }

    #[tokio::test]
    async fn failing_table_does_not_abort_the_batch() {
        let backend = backend();
        let samples = probe_schema(&backend, &names(&["families", "ghost_table"])).await;

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].table, "families");
        assert_eq!(
            samples[0].outcome,
            SampleOutcome::Columns(names(&["created_at", "id", "name"]))
        );
        assert_eq!(samples[1].table, "ghost_table");
        assert!(matches!(samples[1].outcome, SampleOutcome::Failed(ref msg) if msg.contains("does not exist")));
    }

    #[tokio::test]
    async fn empty_table_is_marked_empty() {
        let samples = probe_schema(&backend(), &names(&["rewards"])).await;
        assert_eq!(samples[0].outcome, SampleOutcome::Empty);
    }

    #[tokio::test]
    async fn one_sample_per_name_in_input_order() {
        let tables = names(&["rewards", "ghost_table", "families", "rewards", "bad name"]);
        let backend = backend();
        let samples = probe_schema(&backend, &tables).await;

        let order: Vec<_> = samples.iter().map(|s| s.table.clone()).collect();
        assert_eq!(order, tables);
        assert!(matches!(samples[4].outcome, SampleOutcome::Failed(_)));
        assert!(backend.queries().iter().all(|q| q.limit == Some(1)));
    }

    #[tokio::test]
    async fn probing_twice_gives_identical_samples() {
        let backend = backend();
        let tables = names(&["families", "ghost_table", "rewards"]);
        let first = probe_schema(&backend, &tables).await;
        let second = probe_schema(&backend, &tables).await;
        assert_eq!(first, second);
    }

    #[test]
    fn defaults_cover_the_family_tables() {
        assert_eq!(
            default_tables(),
            names(&["families", "profiles", "missions", "daily_logs", "rewards"])
        );
    }
}
