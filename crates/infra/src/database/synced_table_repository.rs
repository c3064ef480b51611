//! SQLite implementation of the `SyncedTableRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashsync_core::SyncedTableRepository;
use dashsync_domain::{Result as DomainResult, SyncedTable};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tokio::task;

use super::helpers::{
    json_column, map_join_error, map_json_error, map_sql_error, opt_from_millis, to_millis,
};
use super::manager::DbManager;

/// SQLite-backed table registrations with their column metadata.
pub struct SqliteSyncedTableRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncedTableRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncedTableRepository for SqliteSyncedTableRepository {
    async fn find_table(
        &self,
        source_id: &str,
        table_name: &str,
    ) -> DomainResult<Option<SyncedTable>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();
        let table_name = table_name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<SyncedTable>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("{TABLE_SELECT_SQL} WHERE source_id = ?1 AND table_name = ?2"),
                params![source_id, table_name],
                map_table_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn insert_table(&self, table: &SyncedTable) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let table = table.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_table(&conn, &table)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_tables(&self, source_id: &str) -> DomainResult<Vec<SyncedTable>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<SyncedTable>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!(
                    "{TABLE_SELECT_SQL} WHERE source_id = ?1 ORDER BY created_at ASC, rowid ASC"
                ))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map(params![source_id], map_table_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_table(&self, table: &SyncedTable) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let table = table.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            update_table(&conn, &table)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const TABLE_SELECT_SQL: &str = "SELECT id, source_id, table_name, columns, row_count,
        last_schema_synced_at, last_data_synced_at
    FROM synced_tables";

fn insert_table(conn: &Connection, table: &SyncedTable) -> DomainResult<()> {
    let columns = serde_json::to_string(&table.columns)
        .map_err(|e| map_json_error("serialize table columns", e))?;
    let schema_synced = table.last_schema_synced_at.map(to_millis);
    let data_synced = table.last_data_synced_at.map(to_millis);
    let created_at = to_millis(Utc::now());
    let params: [&dyn ToSql; 8] = [
        &table.id,
        &table.source_id,
        &table.table_name,
        &columns,
        &table.row_count,
        &schema_synced,
        &data_synced,
        &created_at,
    ];

    conn.execute(
        "INSERT OR IGNORE INTO synced_tables (
            id, source_id, table_name, columns, row_count,
            last_schema_synced_at, last_data_synced_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params.as_slice(),
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn update_table(conn: &Connection, table: &SyncedTable) -> DomainResult<()> {
    let columns = serde_json::to_string(&table.columns)
        .map_err(|e| map_json_error("serialize table columns", e))?;
    let schema_synced = table.last_schema_synced_at.map(to_millis);
    let data_synced = table.last_data_synced_at.map(to_millis);
    let params: [&dyn ToSql; 5] =
        [&columns, &table.row_count, &schema_synced, &data_synced, &table.id];

    conn.execute(
        "UPDATE synced_tables
         SET columns = ?1, row_count = ?2, last_schema_synced_at = ?3, last_data_synced_at = ?4
         WHERE id = ?5",
        params.as_slice(),
    )
    .map_err(map_sql_error)?;
    Ok(())
}

fn map_table_row(row: &Row<'_>) -> rusqlite::Result<SyncedTable> {
    let columns: String = row.get(3)?;

    Ok(SyncedTable {
        id: row.get(0)?,
        source_id: row.get(1)?,
        table_name: row.get(2)?,
        columns: json_column(3, &columns)?,
        row_count: row.get(4)?,
        last_schema_synced_at: opt_from_millis(row.get(5)?),
        last_data_synced_at: opt_from_millis(row.get(6)?),
    })
}

// ============================================================================
// Tests
// ============================================================================
