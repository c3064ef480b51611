//! Integration tests for parsing generated dashboard configurations.

use dashsync_domain::{
    Aggregation, ChartType, DashboardConfig, DashboardItem, Document, FilterOperator, ItemKind,
};
use serde_json::json;

fn generated_payload() -> serde_json::Value {
    json!({
        "charts": [
            {
                "id": "users_by_status",
                "title": "Users by status",
                "type": "pie",
                "table": "users",
                "columns": {"y": "id", "groupBy": "status"},
                "aggregation": "count"
            },
            {
                "title": "Signups over time",
                "type": "line",
                "table": "users",
                "columns": {"x": "created_at", "y": "id"},
                "aggregation": "count",
                "dateRange": "last_30_days"
            },
            {
                "title": "Revenue",
                "type": "stat",
                "table": "orders",
                "columns": {"y": "total"},
                "aggregation": "sum",
                "filters": [{"field": "status", "operator": "neq", "value": "refunded"}]
            }
        ],
        "kpis": [
            {
                "title": "Total users",
                "table": "users",
                "column": "id",
                "aggregation": "count",
                "icon": "users",
                "compareWith": "previous_period"
            }
        ]
    })
}

#[test]
fn generated_config_parses_and_normalizes() {
    let config: DashboardConfig =
        serde_json::from_value(generated_payload()).expect("config should parse");
    let config = config.normalize();

    assert_eq!(config.charts.len(), 3);
    assert_eq!(config.charts[0].id, "users_by_status");
    assert_eq!(config.charts[0].chart_type, ChartType::Pie);
    assert_eq!(config.charts[0].columns.group_by.as_deref(), Some("status"));
    assert_eq!(config.charts[1].id, "chart_1");
    assert_eq!(config.charts[2].id, "chart_2");
    assert_eq!(config.charts[2].aggregation, Aggregation::Sum);
    assert_eq!(config.charts[2].filters[0].operator, FilterOperator::Neq);

    assert_eq!(config.kpis[0].id, "kpi_1");
    assert!(config.kpis[0].compares_previous_period());
}

#[test]
fn dashboard_item_round_trips_through_storage_shape() {
    let config: DashboardConfig =
        serde_json::from_value(generated_payload()).expect("config should parse");
    let item = DashboardItem::Kpi(config.kpis[0].clone());

    let stored = serde_json::to_string(&item).expect("serialize item");
    let restored: DashboardItem = serde_json::from_str(&stored).expect("deserialize item");

    assert_eq!(restored.kind(), ItemKind::Kpi);
    assert_eq!(restored.table(), "users");
}

#[test]
fn empty_payload_defaults_to_empty_config() {
    let config: DashboardConfig = serde_json::from_value(json!({})).expect("empty config");
    assert!(config.normalize().is_empty());
}

#[test]
fn documents_keep_mixed_types() {
    let doc = Document::from_json(json!({
        "id": 1,
        "amount": "19.99",
        "active": true,
        "meta": {"tags": ["a", "b"]}
    }))
    .expect("document");

    assert_eq!(doc.present("amount").and_then(|v| v.as_f64()), Some(19.99));
    assert_eq!(doc.present("active").and_then(|v| v.as_f64()), None);
    assert_eq!(doc.present("meta").map(|v| v.type_name()), Some("object"));
}
