//! End-to-end coverage for the SQLite store driven by the core services.
//!
//! A wiremock server stands in for a PostgREST source. Each test syncs
//! through the real connector factory into an isolated, migrated database
//! and then builds dashboards from the stored rows.

mod support;

use std::time::Duration;

use dashsync_core::{RowQuery, RowStore};
use dashsync_domain::{
    Aggregation, ChartData, ChartPoint, ChartSpec, ChartType, CustomChartConfig, CustomDataSource,
    DashSyncError, DashboardConfig, DateFormat, DocValue, ExternalSource, Filter, FilterOperator,
    ItemResult, KpiSpec, SourceKind, SyncJobStatus, SyncStatus,
};
use serde_json::{json, Value};
use support::DbHarness;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn users() -> Value {
    let user = |id: i64, status: &str, plan: &str, amount: f64, created_at: &str| {
        json!({
            "id": id,
            "status": status,
            "plan": plan,
            "amount": amount,
            "created_at": created_at
        })
    };
    json!([
        user(1, "active", "pro", 30.0, "2024-03-01T09:00:00Z"),
        user(2, "active", "free", 0.0, "2024-03-01T17:30:00Z"),
        user(3, "churned", "pro", 30.0, "2024-03-02T08:15:00Z"),
        user(4, "active", "pro", 45.5, "2024-03-03T11:00:00Z"),
    ])
}

fn orders() -> Value {
    json!([
        {"id": "o-1", "total": 12.5},
        {"id": "o-2", "total": 7.5}
    ])
}

fn dashboard_config() -> DashboardConfig {
    let mut config = DashboardConfig {
        charts: vec![
            ChartSpec::new("signups", "users", Aggregation::Count)
                .with_type(ChartType::Line)
                .with_x("created_at"),
            ChartSpec::new("by_status", "users", Aggregation::Count)
                .with_type(ChartType::Pie)
                .with_group_by("status"),
            ChartSpec::new("broken", "users", Aggregation::Sum).with_x("plan"),
        ],
        kpis: vec![KpiSpec::new("revenue", "orders", "total", Aggregation::Sum)],
    };
    let mut active_users = KpiSpec::new("active_users", "users", "id", Aggregation::Count);
    active_users.filters.push(Filter::new("status", FilterOperator::Eq, "active"));
    config.kpis.insert(0, active_users);
    config
}

async fn mount_table(server: &MockServer, table: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{table}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn register_rest_source(harness: &DbHarness, server: &MockServer) -> ExternalSource {
    let descriptor = format!("{}|anon-key", server.uri());
    harness
        .sources
        .register("crm", SourceKind::Postgres, &descriptor)
        .await
        .expect("source should register")
}

fn kpi_value(entries: &[dashsync_domain::CacheEntry], id: &str) -> f64 {
    let entry = entries.iter().find(|e| e.item_id == id).expect("kpi should be cached");
    match &entry.result {
        ItemResult::Kpi(kpi) => kpi.value,
        other => panic!("expected kpi result, got {other:?}"),
    }
}

fn chart_data<'a>(entries: &'a [dashsync_domain::CacheEntry], id: &str) -> &'a ChartData {
    let entry = entries.iter().find(|e| e.item_id == id).expect("chart should be cached");
    match &entry.result {
        ItemResult::Chart(data) => data,
        other => panic!("expected chart result, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_then_dashboard_lifecycle() {
    let server = MockServer::start().await;
    mount_table(&server, "users", users()).await;
    mount_table(&server, "orders", orders()).await;

    let harness = DbHarness::new(dashboard_config(), 2);
    let source = register_rest_source(&harness, &server).await;
    harness.sources.register_table(&source.id, "users").await.expect("users registered");
    harness.sources.register_table(&source.id, "orders").await.expect("orders registered");

    let summary = harness.sync.sync_all(&source.id).await.expect("sync should succeed");
    assert_eq!(summary.total_tables, 2);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.total_rows, 6);

    let status = harness.sync.status(&source.id).await.expect("status should load");
    assert_eq!(status.source.sync_status, SyncStatus::Active);
    assert!(status.source.last_synced_at.is_some());
    assert!(status.recent_jobs.iter().all(|job| job.status == SyncJobStatus::Completed));
    let users_table = status.tables.iter().find(|t| t.table_name == "users").expect("users");
    assert_eq!(users_table.row_count, 4);
    assert!(users_table.columns.iter().any(|c| c.name == "created_at"));

    // Cold path: discovery, generation, refresh.
    let loaded = harness.orchestrator.load(&source.id).await.expect("dashboard should load");
    assert!(!loaded.from_cache);
    assert_eq!(harness.generator.calls(), 1);
    let refresh = loaded.refresh.expect("cold path reports a refresh");
    assert_eq!(refresh.charts_cached, 3);
    assert_eq!(refresh.kpis_cached, 2);
    assert_eq!(refresh.failed_items, vec!["broken".to_string()]);

    let dashboard = &loaded.dashboard;
    match chart_data(&dashboard.charts, "signups") {
        ChartData::TimeSeries { points, format } => {
            assert_eq!(*format, DateFormat::IsoT);
            assert_eq!(
                points,
                &vec![
                    ChartPoint::new("2024-03-01", 2.0),
                    ChartPoint::new("2024-03-02", 1.0),
                    ChartPoint::new("2024-03-03", 1.0),
                ]
            );
        }
        other => panic!("expected a time series, got {other:?}"),
    }
    assert_eq!(
        chart_data(&dashboard.charts, "by_status").points(),
        &[ChartPoint::new("active", 3.0), ChartPoint::new("churned", 1.0)]
    );
    assert_eq!(chart_data(&dashboard.charts, "broken"), &ChartData::Empty);
    assert_eq!(kpi_value(&dashboard.kpis, "active_users"), 3.0);
    assert_eq!(kpi_value(&dashboard.kpis, "revenue"), 20.0);

    let stored = harness
        .orchestrator
        .stored_config(&source.id)
        .await
        .expect("config lookup")
        .expect("generated config should be stored");
    assert_eq!(stored.model.as_deref(), Some("fixed-model"));

    // Warm path.
    let warm = harness.orchestrator.load(&source.id).await.expect("dashboard should load");
    assert!(warm.from_cache);
    assert_eq!(warm.dashboard.len(), 5);

    // A newer sync makes the cache stale; the stored config is reused.
    tokio::time::sleep(Duration::from_millis(10)).await;
    harness.sync.sync_table(&source.id, "users").await.expect("resync should succeed");
    assert!(harness.cache.is_stale(&source.id).await.expect("staleness check"));
    let rebuilt = harness.orchestrator.load(&source.id).await.expect("dashboard should load");
    assert!(!rebuilt.from_cache);
    assert_eq!(harness.generator.calls(), 1);

    // Regenerate drops config and cache; the next load generates again.
    harness.orchestrator.regenerate(&source.id).await.expect("regenerate should succeed");
    assert_eq!(harness.count("dashboard_cache"), 0);
    assert!(harness.orchestrator.stored_config(&source.id).await.expect("lookup").is_none());
    harness.orchestrator.load(&source.id).await.expect("dashboard should load");
    assert_eq!(harness.generator.calls(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_batch_keeps_previous_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_table(&server, "users", users()).await;

    let harness = DbHarness::new(DashboardConfig::default(), 2);
    harness.execute_batch(
        "CREATE TRIGGER reject_third_user BEFORE INSERT ON synced_rows
         WHEN NEW.original_id = '3'
         BEGIN SELECT RAISE(ABORT, 'boom'); END;",
    );
    let source = register_rest_source(&harness, &server).await;
    harness.sources.register_table(&source.id, "users").await.expect("users registered");

    let first = harness.sync.sync_table(&source.id, "users").await.expect("first sync");
    assert_eq!(first, 2);

    let err = harness.sync.sync_table(&source.id, "users").await.expect_err("should fail");
    assert!(matches!(err, DashSyncError::BatchInsert { batch_index: 2, .. }), "got {err:?}");

    let query = RowQuery::new(&source.id, "users");
    assert_eq!(harness.rows.count(&query).await.expect("count"), 2);

    let status = harness.sync.status(&source.id).await.expect("status should load");
    let latest = status.recent_jobs.first().expect("jobs recorded");
    assert_eq!(latest.status, SyncJobStatus::Error);
    assert!(latest.error_message.as_deref().unwrap_or_default().contains("batch 2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn custom_charts_follow_current_rows() {
    let server = MockServer::start().await;
    mount_table(&server, "users", users()).await;

    let harness = DbHarness::new(DashboardConfig::default(), 100);
    let source = register_rest_source(&harness, &server).await;
    harness.sources.register_table(&source.id, "users").await.expect("users registered");
    harness.sync.sync_table(&source.id, "users").await.expect("sync should succeed");

    let config = CustomChartConfig {
        id: String::new(),
        title: "Revenue by plan".into(),
        chart_type: ChartType::Bar,
        data_source: CustomDataSource {
            table: "users".into(),
            x_axis: "plan".into(),
            y_axis: vec!["amount".into()],
        },
        filters: vec![Filter::new("status", FilterOperator::Eq, "active")],
        aggregation: Aggregation::Sum,
        group_by: None,
    };
    let saved = harness.custom_charts.save(&source.id, config).await.expect("chart saved");
    assert!(saved.config.id.starts_with("custom_"));
    assert_eq!(saved.data.len(), 2);
    let pro = saved
        .data
        .iter()
        .find(|row| row.get("plan").and_then(DocValue::as_text).as_deref() == Some("pro"))
        .expect("pro group");
    assert_eq!(pro.get("amount").and_then(DocValue::as_f64), Some(75.5));

    let listed = harness.custom_charts.list(&source.id).await.expect("charts listed");
    assert_eq!(listed.len(), 1);

    harness.custom_charts.delete(&source.id, &saved.config.id).await.expect("chart deleted");
    let err = harness.custom_charts.delete(&source.id, &saved.config.id).await.unwrap_err();
    assert_eq!(err.label(), "not_found");
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_a_source_cascades_to_local_state() {
    let server = MockServer::start().await;
    mount_table(&server, "users", users()).await;

    let harness = DbHarness::new(dashboard_config(), 100);
    let source = register_rest_source(&harness, &server).await;
    harness.sources.register_table(&source.id, "users").await.expect("users registered");
    harness.sync.sync_all(&source.id).await.expect("sync should succeed");
    harness.orchestrator.load(&source.id).await.expect("dashboard should load");
    assert!(harness.count("dashboard_cache") > 0);

    harness.sources.remove(&source.id).await.expect("source removed");

    for table in
        ["synced_tables", "synced_rows", "sync_jobs", "dashboard_cache", "dashboard_configs"]
    {
        assert_eq!(harness.count(table), 0, "{table} should be empty");
    }
    let err = harness.sources.remove(&source.id).await.unwrap_err();
    assert_eq!(err.label(), "not_found");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_table_is_reported_per_table() {
    let server = MockServer::start().await;
    mount_table(&server, "users", users()).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no relation"})))
        .mount(&server)
        .await;

    let harness = DbHarness::new(DashboardConfig::default(), 100);
    let source = register_rest_source(&harness, &server).await;
    harness.sources.register_table(&source.id, "users").await.expect("users registered");
    harness.sources.register_table(&source.id, "missing").await.expect("missing registered");

    let summary = harness.sync.sync_all(&source.id).await.expect("sync should return summary");
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failed_count, 1);
    let failed = summary.tables.iter().find(|t| !t.success).expect("failed table");
    assert_eq!(failed.table_name, "missing");

    let source = harness.sources.get(&source.id).await.expect("lookup").expect("source");
    assert_eq!(source.sync_status, SyncStatus::Error);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_rest_source_aborts_the_whole_sync() {
    let harness = DbHarness::new(DashboardConfig::default(), 100);
    let source = harness
        .sources
        .register("crm", SourceKind::Postgres, "http://127.0.0.1:1|anon-key")
        .await
        .expect("source should register");
    harness.sources.register_table(&source.id, "users").await.expect("users registered");
    harness.sources.register_table(&source.id, "orders").await.expect("orders registered");

    let err = harness.sync.sync_all(&source.id).await.expect_err("sync should abort");
    assert!(matches!(err, DashSyncError::Connection(_)), "unexpected error: {err:?}");

    let err = harness.sources.test_connection(&source.id).await.expect_err("test should fail");
    assert!(matches!(err, DashSyncError::Connection(_)), "unexpected error: {err:?}");

    let source = harness.sources.get(&source.id).await.expect("lookup").expect("source");
    assert_eq!(source.sync_status, SyncStatus::Error);
    let status = harness.sync.status(&source.id).await.expect("status should load");
    assert!(status.recent_jobs.is_empty());
}
