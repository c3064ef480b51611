//! SQLite implementation of the `SyncJobRepository` port.

use std::sync::Arc;

use async_trait::async_trait;
use dashsync_core::SyncJobRepository;
use dashsync_domain::{Result as DomainResult, SyncJob, SyncJobStatus};
use rusqlite::{params, Connection, Row, ToSql};
use tokio::task;

use super::helpers::{
    from_millis, map_join_error, map_sql_error, opt_from_millis, parse_status, to_millis,
    usize_to_i64,
};
use super::manager::DbManager;

/// SQLite-backed sync job history.
pub struct SqliteSyncJobRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncJobRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SyncJobRepository for SqliteSyncJobRepository {
    async fn insert_job(&self, job: &SyncJob) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let job = job.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            write_job(&conn, JOB_INSERT_SQL, &job)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_job(&self, job: &SyncJob) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let job = job.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            write_job(&conn, JOB_UPDATE_SQL, &job)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn recent_jobs(&self, source_id: &str, limit: usize) -> DomainResult<Vec<SyncJob>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();
        let limit = usize_to_i64(limit);

        task::spawn_blocking(move || -> DomainResult<Vec<SyncJob>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(JOB_RECENT_SQL).map_err(map_sql_error)?;
            let rows =
                stmt.query_map(params![source_id, limit], map_job_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const JOB_INSERT_SQL: &str = "INSERT INTO sync_jobs (
        id, source_id, table_name, status, rows_synced, error_message, started_at, completed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const JOB_UPDATE_SQL: &str = "UPDATE sync_jobs
    SET source_id = ?2, table_name = ?3, status = ?4, rows_synced = ?5,
        error_message = ?6, started_at = ?7, completed_at = ?8
    WHERE id = ?1";

const JOB_RECENT_SQL: &str = "SELECT id, source_id, table_name, status, rows_synced,
        error_message, started_at, completed_at
    FROM sync_jobs
    WHERE source_id = ?1
    ORDER BY started_at DESC, rowid DESC
    LIMIT ?2";

fn write_job(conn: &Connection, sql: &str, job: &SyncJob) -> DomainResult<()> {
    let status = job.status.to_string();
    let started_at = to_millis(job.started_at);
    let completed_at = job.completed_at.map(to_millis);
    let params: [&dyn ToSql; 8] = [
        &job.id,
        &job.source_id,
        &job.table_name,
        &status,
        &job.rows_synced,
        &job.error_message,
        &started_at,
        &completed_at,
    ];

    conn.execute(sql, params.as_slice()).map_err(map_sql_error)?;
    Ok(())
}

fn map_job_row(row: &Row<'_>) -> rusqlite::Result<SyncJob> {
    let status: String = row.get(3)?;

    Ok(SyncJob {
        id: row.get(0)?,
        source_id: row.get(1)?,
        table_name: row.get(2)?,
        status: parse_status("sync_jobs.status", &status, SyncJobStatus::Error),
        rows_synced: row.get(4)?,
        error_message: row.get(5)?,
        started_at: from_millis(row.get(6)?),
        completed_at: opt_from_millis(row.get(7)?),
    })
}

// ============================================================================
// Tests
// ============================================================================
