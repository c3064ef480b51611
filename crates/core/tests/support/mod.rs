//! Shared test helpers for `dashsync-core` integration tests.
//!
//! [`Harness`] wires every service to in-memory mocks so tests can focus on
//! behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod connectors;
pub mod repositories;

use std::sync::Arc;

use dashsync_core::{
    AggregationEngine, CacheService, CustomChartService, DashboardOrchestrator, DiscoveryService,
    SourceService, SyncEngine,
};
use dashsync_domain::{DashboardConfig, Document, ExternalSource, SourceKind};
use serde_json::Value;

use self::connectors::{ScriptedConnectorFactory, StubGenerator};
use self::repositories::{
    MockCacheRepository, MockConfigRepository, MockCustomChartRepository, MockJobRepository,
    MockRowStore, MockSourceRepository, MockTableRepository,
};

pub struct Harness {
    pub sources: MockSourceRepository,
    pub tables: MockTableRepository,
    pub rows: MockRowStore,
    pub jobs: MockJobRepository,
    pub cache_repo: MockCacheRepository,
    pub configs: MockConfigRepository,
    pub factory: ScriptedConnectorFactory,
    pub generator: StubGenerator,
    pub source_service: SourceService,
    pub sync: SyncEngine,
    pub engine: Arc<AggregationEngine>,
    pub cache: Arc<CacheService>,
    pub orchestrator: DashboardOrchestrator,
    pub custom_charts: CustomChartService,
}

impl Harness {
    pub fn new(generated: DashboardConfig) -> Self {
        let sources = MockSourceRepository::default();
        let tables = MockTableRepository::default();
        let rows = MockRowStore::default();
        let jobs = MockJobRepository::default();
        let cache_repo = MockCacheRepository::default();
        let configs = MockConfigRepository::default();
        let factory = ScriptedConnectorFactory::default();
        let generator = StubGenerator::new(generated);

        let source_service = SourceService::new(
            Arc::new(sources.clone()),
            Arc::new(tables.clone()),
            Arc::new(factory.clone()),
        );
        let sync = SyncEngine::new(
            Arc::new(sources.clone()),
            Arc::new(tables.clone()),
            Arc::new(rows.clone()),
            Arc::new(jobs.clone()),
            Arc::new(factory.clone()),
        )
        .with_batch_size(2);
        let engine = Arc::new(AggregationEngine::new(Arc::new(rows.clone())));
        let cache = Arc::new(CacheService::new(
            Arc::new(cache_repo.clone()),
            Arc::new(sources.clone()),
            Arc::clone(&engine),
        ));
        let discovery =
            Arc::new(DiscoveryService::new(Arc::new(tables.clone()), Arc::new(rows.clone())));
        let orchestrator = DashboardOrchestrator::new(
            Arc::clone(&cache),
            discovery,
            Arc::new(configs.clone()),
            Arc::new(generator.clone()),
        );
        let custom_charts = CustomChartService::new(
            Arc::new(MockCustomChartRepository::default()),
            Arc::clone(&engine),
        );

        Self {
            sources,
            tables,
            rows,
            jobs,
            cache_repo,
            configs,
            factory,
            generator,
            source_service,
            sync,
            engine,
            cache,
            orchestrator,
            custom_charts,
        }
    }

    /// Register a Postgres REST source.
    pub async fn register_source(&self) -> ExternalSource {
        self.source_service
            .register("Production", SourceKind::Postgres, "supabase://proj:anon")
            .await
            .expect("register source")
    }

    /// Register `table`, serve `rows` for it and sync it.
    pub async fn seed_table(&self, source_id: &str, table: &str, rows: Vec<Value>) -> usize {
        self.source_service.register_table(source_id, table).await.expect("register table");
        self.factory.connector.set_table(table, documents(rows));
        self.sync.sync_table(source_id, table).await.expect("sync table")
    }
}

pub fn documents(rows: Vec<Value>) -> Vec<Document> {
    rows.into_iter().map(|row| Document::from_json(row).expect("object row")).collect()
}

pub fn users_rows() -> Vec<Value> {
    vec![
        serde_json::json!({"id": 1, "status": "active", "created_at": "2024-01-05T00:00:00"}),
        serde_json::json!({"id": 2, "status": "inactive", "created_at": "2024-01-05T00:00:00"}),
        serde_json::json!({"id": 3, "status": "active", "created_at": "2024-02-01T00:00:00"}),
    ]
}
