//! SQLite storage for user-defined charts and their last computed rows.

use std::sync::Arc;

use async_trait::async_trait;
use dashsync_core::CustomChartRepository;
use dashsync_domain::{CustomChartEntry, Result as DomainResult};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tokio::task;

use super::helpers::{
    from_millis, json_column, map_join_error, map_json_error, map_sql_error, to_millis,
};
use super::manager::DbManager;

pub struct SqliteCustomChartRepository {
    db: Arc<DbManager>,
}

impl SqliteCustomChartRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CustomChartRepository for SqliteCustomChartRepository {
    async fn save_chart(&self, entry: &CustomChartEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            save_chart(&conn, &entry)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_charts(&self, source_id: &str) -> DomainResult<Vec<CustomChartEntry>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<CustomChartEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "{CHART_SELECT_SQL} WHERE source_id = ?1 ORDER BY computed_at DESC, rowid DESC"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map(params![source_id], map_chart_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_chart(
        &self,
        source_id: &str,
        chart_id: &str,
    ) -> DomainResult<Option<CustomChartEntry>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();
        let chart_id = chart_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<CustomChartEntry>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("{CHART_SELECT_SQL} WHERE source_id = ?1 AND chart_id = ?2"),
                params![source_id, chart_id],
                map_chart_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn delete_chart(&self, source_id: &str, chart_id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();
        let chart_id = chart_id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute(
                    "DELETE FROM custom_charts WHERE source_id = ?1 AND chart_id = ?2",
                    params![source_id, chart_id],
                )
                .map_err(map_sql_error)?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const CHART_SELECT_SQL: &str = "SELECT source_id, config, data, computed_at FROM custom_charts";

fn save_chart(conn: &Connection, entry: &CustomChartEntry) -> DomainResult<()> {
    let config = serde_json::to_string(&entry.config)
        .map_err(|e| map_json_error("serialize custom chart", e))?;
    let data = serde_json::to_string(&entry.data)
        .map_err(|e| map_json_error("serialize custom chart rows", e))?;
    let computed_at = to_millis(entry.computed_at);
    let params: [&dyn ToSql; 5] =
        [&entry.source_id, &entry.config.id, &config, &data, &computed_at];

    conn.execute(
        "INSERT INTO custom_charts (source_id, chart_id, config, data, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(source_id, chart_id) DO UPDATE SET
             config = excluded.config,
             data = excluded.data,
             computed_at = excluded.computed_at",
        params.as_slice(),
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn map_chart_row(row: &Row<'_>) -> rusqlite::Result<CustomChartEntry> {
    let config: String = row.get(1)?;
    let data: String = row.get(2)?;

    Ok(CustomChartEntry {
        source_id: row.get(0)?,
        config: json_column(1, &config)?,
        data: json_column(2, &data)?,
        computed_at: from_millis(row.get(3)?),
    })
}

// ============================================================================
// Tests
// ============================================================================
