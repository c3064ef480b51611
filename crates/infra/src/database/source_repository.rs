//! SQLite implementation of the `SourceRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_core::SourceRepository;
use dashsync_domain::{ExternalSource, Result as DomainResult, SyncStatus};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tokio::task;
use tracing::{debug, instrument};

use super::helpers::{
    enum_column, from_millis, map_join_error, map_sql_error, opt_from_millis, parse_status,
    to_millis,
};
use super::manager::DbManager;

/// SQLite-backed registry of external sources.
pub struct SqliteSourceRepository {
    db: Arc<DbManager>,
}

impl SqliteSourceRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    #[instrument(skip(self, source), fields(source_id = %source.id))]
    async fn insert_source(&self, source: &ExternalSource) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let source = source.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            insert_source(&conn, &source)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_source(&self, id: &str) -> DomainResult<Option<ExternalSource>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<ExternalSource>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("{SOURCE_SELECT_SQL} WHERE id = ?1"),
                params![id],
                map_source_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_sources(&self) -> DomainResult<Vec<ExternalSource>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<ExternalSource>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("{SOURCE_SELECT_SQL} ORDER BY created_at ASC, rowid ASC"))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_source_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_sync_status(&self, id: &str, status: SyncStatus) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let status = status.to_string();
            conn.execute(
                "UPDATE external_sources SET sync_status = ?1 WHERE id = ?2",
                params![status, id],
            )
            .map_err(map_sql_error)?;
            debug!(source_id = %id, %status, "source status updated");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_synced(&self, id: &str, synced_at: DateTime<Utc>) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "UPDATE external_sources SET last_synced_at = ?1 WHERE id = ?2",
                params![to_millis(synced_at), id],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn delete_source(&self, id: &str) -> DomainResult<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> DomainResult<bool> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute("DELETE FROM external_sources WHERE id = ?1", params![id])
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

const SOURCE_SELECT_SQL: &str = "SELECT id, name, kind, descriptor, sync_status, sync_enabled,
        sync_schedule, last_synced_at, created_at
    FROM external_sources";

const SOURCE_INSERT_SQL: &str = "INSERT INTO external_sources (
        id, name, kind, descriptor, sync_status, sync_enabled, sync_schedule,
        last_synced_at, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

fn insert_source(conn: &Connection, source: &ExternalSource) -> DomainResult<()> {
    let kind = source.kind.to_string();
    let status = source.sync_status.to_string();
    let last_synced_at = source.last_synced_at.map(to_millis);
    let created_at = to_millis(source.created_at);
    let params: [&dyn ToSql; 9] = [
        &source.id,
        &source.name,
        &kind,
        &source.descriptor,
        &status,
        &source.sync_enabled,
        &source.sync_schedule,
        &last_synced_at,
        &created_at,
    ];

    conn.execute(SOURCE_INSERT_SQL, params.as_slice()).map_err(map_sql_error)?;
    Ok(())
}

fn map_source_row(row: &Row<'_>) -> rusqlite::Result<ExternalSource> {
    let kind: String = row.get(2)?;
    let status: String = row.get(4)?;

    Ok(ExternalSource {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: enum_column(2, &kind)?,
        descriptor: row.get(3)?,
        sync_status: parse_status("sync_status", &status, SyncStatus::Error),
        sync_enabled: row.get(5)?,
        sync_schedule: row.get(6)?,
        last_synced_at: opt_from_millis(row.get(7)?),
        created_at: from_millis(row.get(8)?),
    })
}

// ============================================================================
// Tests
// ============================================================================
