//! SQLite row store
//!
//! One JSON document per external row in `synced_rows`. A replace deletes the
//! table's rows and inserts the new set in batches inside a single
//! transaction, so readers on other connections see either the old rows or
//! the new ones. Every row written by one replace shares its `synced_at`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_core::{RowQuery, RowStore};
use dashsync_domain::{
    DashSyncError, Document, NewRow, Result as DomainResult, SyncedRow, SyncedTable,
};
use rusqlite::{params, params_from_iter, Connection, Row, ToSql};
use tokio::task;
use tracing::{debug, info, instrument, warn};

use super::helpers::{from_millis, map_join_error, map_sql_error, to_millis, usize_to_i64};
use super::manager::DbManager;
use super::query::WhereClause;

/// Row store backed by the local SQLite database.
pub struct SqliteRowStore {
    db: Arc<DbManager>,
}

impl SqliteRowStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RowStore for SqliteRowStore {
    #[instrument(skip(self, table, rows), fields(table_id = %table.id, rows = rows.len()))]
    async fn replace_rows(
        &self,
        table: &SyncedTable,
        rows: Vec<NewRow>,
        batch_size: usize,
    ) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let table = table.clone();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let mut conn = db.get_connection()?;
            replace_table_rows(&mut conn, &table, &rows, batch_size.max(1))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn scan(&self, query: &RowQuery) -> DomainResult<Vec<Document>> {
        let db = Arc::clone(&self.db);
        let clause = WhereClause::for_query(query);

        task::spawn_blocking(move || -> DomainResult<Vec<Document>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT data FROM synced_rows WHERE {} ORDER BY id", clause.sql());
            query_documents(&conn, &sql, &clause)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count(&self, query: &RowQuery) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let clause = WhereClause::for_query(query);

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            count_rows(&conn, &clause)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn count_synced_between(
        &self,
        query: &RowQuery,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DomainResult<i64> {
        let db = Arc::clone(&self.db);
        let mut clause = WhereClause::for_query(query);
        let lower = clause.bind(to_millis(from));
        clause.push(format!("synced_at >= {lower}"));
        if let Some(to) = to {
            let upper = clause.bind(to_millis(to));
            clause.push(format!("synced_at < {upper}"));
        }

        task::spawn_blocking(move || -> DomainResult<i64> {
            let conn = db.get_connection()?;
            count_rows(&conn, &clause)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn sample(&self, synced_table_id: &str, limit: usize) -> DomainResult<Vec<Document>> {
        let db = Arc::clone(&self.db);
        let mut clause = WhereClause::new();
        let table = clause.bind(synced_table_id.to_string());
        clause.push(format!("synced_table_id = {table}"));
        let limit = clause.bind(usize_to_i64(limit));

        task::spawn_blocking(move || -> DomainResult<Vec<Document>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT data FROM synced_rows WHERE {} ORDER BY id LIMIT {limit}",
                clause.sql()
            );
            query_documents(&conn, &sql, &clause)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn rows(&self, synced_table_id: &str) -> DomainResult<Vec<SyncedRow>> {
        let db = Arc::clone(&self.db);
        let synced_table_id = synced_table_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<SyncedRow>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(ROWS_BY_TABLE_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![synced_table_id], map_raw_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            rows.into_iter().map(RawRow::into_synced_row).collect()
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const DELETE_ROWS_SQL: &str = "DELETE FROM synced_rows WHERE synced_table_id = ?1";

const INSERT_ROW_SQL: &str = "INSERT INTO synced_rows (
        synced_table_id, source_id, table_name, original_id, data, synced_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const ROWS_BY_TABLE_SQL: &str = "SELECT id, synced_table_id, source_id, table_name,
        original_id, data, synced_at
    FROM synced_rows
    WHERE synced_table_id = ?1
    ORDER BY id";

fn replace_table_rows(
    conn: &mut Connection,
    table: &SyncedTable,
    rows: &[NewRow],
    batch_size: usize,
) -> DomainResult<usize> {
    let synced_at = to_millis(Utc::now());
    let tx = conn.transaction().map_err(map_sql_error)?;

    let removed = tx.execute(DELETE_ROWS_SQL, params![table.id]).map_err(map_sql_error)?;

    {
        let mut stmt = tx.prepare_cached(INSERT_ROW_SQL).map_err(map_sql_error)?;
        for (index, batch) in rows.chunks(batch_size).enumerate() {
            let batch_index = index + 1;
            for row in batch {
                let data = row.document.to_json_string();
                let params: [&dyn ToSql; 6] = [
                    &table.id,
                    &table.source_id,
                    &table.table_name,
                    &row.original_id,
                    &data,
                    &synced_at,
                ];
                stmt.execute(params.as_slice()).map_err(|err| {
                    warn!(batch_index, error = %err, "row batch insert failed");
                    DashSyncError::BatchInsert { batch_index, message: err.to_string() }
                })?;
            }
            debug!(batch_index, rows = batch.len(), "row batch written");
        }
    }

    tx.commit().map_err(map_sql_error)?;

    info!(table_id = %table.id, removed, inserted = rows.len(), "table rows replaced");
    Ok(rows.len())
}

fn query_documents(
    conn: &Connection,
    sql: &str,
    clause: &WhereClause,
) -> DomainResult<Vec<Document>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let raw = stmt
        .query_map(params_from_iter(clause.params().iter()), |row| row.get::<_, String>(0))
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;
    raw.iter().map(|data| Document::from_json_str(data)).collect()
}

fn count_rows(conn: &Connection, clause: &WhereClause) -> DomainResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM synced_rows WHERE {}", clause.sql());
    conn.query_row(&sql, params_from_iter(clause.params().iter()), |row| row.get(0))
        .map_err(map_sql_error)
}

struct RawRow {
    id: i64,
    synced_table_id: String,
    source_id: String,
    table_name: String,
    original_id: String,
    data: String,
    synced_at: i64,
}

impl RawRow {
    fn into_synced_row(self) -> DomainResult<SyncedRow> {
        Ok(SyncedRow {
            id: self.id,
            synced_table_id: self.synced_table_id,
            source_id: self.source_id,
            table_name: self.table_name,
            original_id: self.original_id,
            document: Document::from_json_str(&self.data)?,
            synced_at: from_millis(self.synced_at),
        })
    }
}

fn map_raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        synced_table_id: row.get(1)?,
        source_id: row.get(2)?,
        table_name: row.get(3)?,
        original_id: row.get(4)?,
        data: row.get(5)?,
        synced_at: row.get(6)?,
    })
}

// ============================================================================
// Tests
// ============================================================================
