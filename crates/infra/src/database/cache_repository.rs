//! SQLite implementation of the dashboard result cache.
//!
//! Entries are keyed by (source_id, item_id). The item spec and its result
//! are stored as JSON next to the item kind so listings never need to parse
//! a spec to split charts from KPIs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashsync_core::CacheRepository;
use dashsync_domain::{CacheEntry, Result as DomainResult};
use rusqlite::{params, Connection, Row, ToSql};
use tokio::task;
use tracing::debug;

use super::helpers::{
    from_millis, json_column, map_join_error, map_json_error, map_sql_error, opt_from_millis,
    to_millis,
};
use super::manager::DbManager;

pub struct SqliteCacheRepository {
    db: Arc<DbManager>,
}

impl SqliteCacheRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CacheRepository for SqliteCacheRepository {
    async fn upsert_entry(&self, entry: &CacheEntry) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let entry = entry.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            upsert_entry(&conn, &entry)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_entries(&self, source_id: &str) -> DomainResult<Vec<CacheEntry>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Vec<CacheEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(CACHE_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt.query_map(params![source_id], map_entry_row).map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn clear_entries(&self, source_id: &str) -> DomainResult<usize> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<usize> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM dashboard_cache WHERE source_id = ?1", params![source_id])
                .map_err(map_sql_error)?;
            debug!(source_id = %source_id, removed, "cache entries cleared");
            Ok(removed)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn latest_computed_at(&self, source_id: &str) -> DomainResult<Option<DateTime<Utc>>> {
        let db = Arc::clone(&self.db);
        let source_id = source_id.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<DateTime<Utc>>> {
            let conn = db.get_connection()?;
            let latest: Option<i64> = conn
                .query_row(
                    "SELECT MAX(computed_at) FROM dashboard_cache WHERE source_id = ?1",
                    params![source_id],
                    |row| row.get(0),
                )
                .map_err(map_sql_error)?;
            Ok(opt_from_millis(latest))
        })
        .await
        .map_err(map_join_error)?
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

const CACHE_UPSERT_SQL: &str = "INSERT INTO dashboard_cache (
        source_id, item_id, item_kind, item, result, computed_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(source_id, item_id) DO UPDATE SET
        item_kind = excluded.item_kind,
        item = excluded.item,
        result = excluded.result,
        computed_at = excluded.computed_at";

const CACHE_LIST_SQL: &str = "SELECT source_id, item_id, item, result, computed_at
    FROM dashboard_cache
    WHERE source_id = ?1
    ORDER BY computed_at ASC, rowid ASC";

fn upsert_entry(conn: &Connection, entry: &CacheEntry) -> DomainResult<()> {
    let kind = entry.kind().to_string();
    let item =
        serde_json::to_string(&entry.item).map_err(|e| map_json_error("serialize item", e))?;
    let result = serde_json::to_string(&entry.result)
        .map_err(|e| map_json_error("serialize item result", e))?;
    let computed_at = to_millis(entry.computed_at);
    let params: [&dyn ToSql; 6] =
        [&entry.source_id, &entry.item_id, &kind, &item, &result, &computed_at];

    conn.execute(CACHE_UPSERT_SQL, params.as_slice()).map_err(map_sql_error)?;
    Ok(())
}

fn map_entry_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let item: String = row.get(2)?;
    let result: String = row.get(3)?;

    Ok(CacheEntry {
        source_id: row.get(0)?,
        item_id: row.get(1)?,
        item: json_column(2, &item)?,
        result: json_column(3, &result)?,
        computed_at: from_millis(row.get(4)?),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use dashsync_domain::{
        Aggregation, ChartData, ChartPoint, ChartSpec, DashboardItem, ItemResult, KpiSpec,
        KpiValue,
    };

    use super::*;
    use crate::database::test_support::{seed_source, setup_test_db};

    fn chart_entry(item_id: &str, computed_ms: i64) -> CacheEntry {
        CacheEntry {
            source_id: "src".into(),
            item_id: item_id.into(),
            item: DashboardItem::Chart(ChartSpec::new(item_id, "users", Aggregation::Count)),
            result: ItemResult::Chart(ChartData::Category {
                points: vec![ChartPoint::new("a", 2.0)],
            }),
            computed_at: Utc.timestamp_millis_opt(computed_ms).single().unwrap(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upsert_overwrites_and_listing_is_oldest_first() {
        let (db, _dir) = setup_test_db();
        seed_source(&db, "src").await;
        let repo = SqliteCacheRepository::new(db);

        repo.upsert_entry(&chart_entry("c1", 2_000)).await.expect("upsert");
        repo.upsert_entry(&chart_entry("c2", 1_000)).await.expect("upsert");
        let kpi = CacheEntry {
            source_id: "src".into(),
            item_id: "k1".into(),
            item: DashboardItem::Kpi(KpiSpec::new("k1", "users", "id", Aggregation::Count)),
            result: ItemResult::Kpi(KpiValue { value: 3.0, growth: 50.0, row_count: 3 }),
            computed_at: Utc.timestamp_millis_opt(3_000).single().unwrap(),
        };
        repo.upsert_entry(&kpi).await.expect("upsert");
        repo.upsert_entry(&chart_entry("c2", 4_000)).await.expect("overwrite");

        let entries = repo.list_entries("src").await.expect("list should succeed");
        let ids: Vec<_> = entries.iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "k1", "c2"]);
        assert_eq!(entries[1], kpi);

        let latest = repo.latest_computed_at("src").await.expect("latest");
        assert_eq!(latest, Some(Utc.timestamp_millis_opt(4_000).single().unwrap()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clear_removes_only_the_sources_entries() {
        let (db, _dir) = setup_test_db();
        seed_source(&db, "src").await;
        seed_source(&db, "other").await;
        let repo = SqliteCacheRepository::new(db);

        repo.upsert_entry(&chart_entry("c1", 1_000)).await.expect("upsert");
        let mut foreign = chart_entry("c1", 1_000);
        foreign.source_id = "other".into();
        repo.upsert_entry(&foreign).await.expect("upsert");

        assert_eq!(repo.clear_entries("src").await.expect("clear"), 1);
        assert!(repo.list_entries("src").await.expect("list").is_empty());
        assert_eq!(repo.latest_computed_at("src").await.expect("latest"), None);
        assert_eq!(repo.list_entries("other").await.expect("list").len(), 1);
    }
}
