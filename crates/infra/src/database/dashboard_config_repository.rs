//! SQLite storage for generated dashboard configurations, one per source.

use std::sync::Arc;

use async_trait::async_trait;
use dashsync_core::DashboardConfigRepository;
use dashsync_domain::{DashboardConfigRecord, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use tokio::task;

use super::helpers::{
    from_millis, json_column, map_join_error, map_json_error, map_sql_error, to_millis,
};
use super::manager::DbManager;

pub struct SqliteDashboardConfigRepository {
    db: Arc<DbManager>,
}

impl SqliteDashboardConfigRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DashboardConfigRepository for SqliteDashboardConfigRepository {
    async fn get_config(&self, source_id: &str) -> DomainResult<Option<DashboardConfigRecord>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<DashboardConfigRecord>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT source_id, config, model, reasoning, generated_at, updated_at
                 FROM dashboard_configs WHERE source_id = ?1",
                params![source_id],
                map_config_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn save_config(&self, record: &DashboardConfigRecord) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let record = record.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let config = serde_json::to_string(&record.config)
                .map_err(|e| map_json_error("serialize dashboard config", e))?;
            let generated_at = to_millis(record.generated_at);
            let updated_at = to_millis(record.updated_at);
            let params: [&dyn ToSql; 6] = [
                &record.source_id,
                &config,
                &record.model,
                &record.reasoning,
                &generated_at,
                &updated_at,
            ];

            conn.execute(
                "INSERT INTO dashboard_configs (
                    source_id, config, model, reasoning, generated_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(source_id) DO UPDATE SET
                    config = excluded.config,
                    model = excluded.model,
                    reasoning = excluded.reasoning,
                    generated_at = excluded.generated_at,
                    updated_at = excluded.updated_at",
                params.as_slice(),
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_config(&self, source_id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute("DELETE FROM dashboard_configs WHERE source_id = ?1", params![source_id])
                .map_err(map_sql_error)?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_config_row(row: &Row<'_>) -> rusqlite::Result<DashboardConfigRecord> {
    let config: String = row.get(1)?;

    Ok(DashboardConfigRecord {
        source_id: row.get(0)?,
        config: json_column(1, &config)?,
        model: row.get(2)?,
        reasoning: row.get(3)?,
        generated_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}
