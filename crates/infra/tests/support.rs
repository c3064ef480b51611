//! Shared wiring for infra integration tests: a migrated temporary database
//! plus the core services backed by the SQLite repositories.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashsync_core::{
    AggregationEngine, CacheService, ConfigGenerator, CustomChartService, DashboardOrchestrator,
    DiscoveryService, SourceService, SyncEngine,
};
use dashsync_domain::{DashboardConfig, DiscoveredTable, GeneratedConfig, Result};
use dashsync_infra::database::{
    DbManager, PoolConfig, SqliteCacheRepository, SqliteCustomChartRepository,
    SqliteDashboardConfigRepository, SqliteRowStore, SqliteSourceRepository,
    SqliteSyncJobRepository, SqliteSyncedTableRepository,
};
use dashsync_infra::http::HttpClient;
use dashsync_infra::SourceConnectorFactory;
use tempfile::TempDir;

/// Generator returning a fixed configuration and counting its calls.
pub struct FixedGenerator {
    config: DashboardConfig,
    calls: AtomicUsize,
}

impl FixedGenerator {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigGenerator for FixedGenerator {
    async fn generate(&self, _tables: &[DiscoveredTable]) -> Result<GeneratedConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedConfig {
            config: self.config.clone().normalize(),
            reasoning: "fixed".to_string(),
            model: "fixed-model".to_string(),
        })
    }
}

/// Temporary database plus every service wired against it. The temp dir
/// lives as long as the harness.
pub struct DbHarness {
    _temp_dir: TempDir,
    pub manager: Arc<DbManager>,
    pub rows: Arc<SqliteRowStore>,
    pub generator: Arc<FixedGenerator>,
    pub sources: SourceService,
    pub sync: SyncEngine,
    pub cache: Arc<CacheService>,
    pub orchestrator: DashboardOrchestrator,
    pub custom_charts: CustomChartService,
}

impl DbHarness {
    pub fn new(generated: DashboardConfig, batch_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("temporary directory should be created");
        let db_path = temp_dir.path().join("infra-integration.db");

        let manager = Arc::new(
            DbManager::new(&db_path, &PoolConfig::default())
                .expect("database manager should initialise"),
        );
        manager.run_migrations().expect("schema migrations should apply");

        let source_repo = Arc::new(SqliteSourceRepository::new(Arc::clone(&manager)));
        let table_repo = Arc::new(SqliteSyncedTableRepository::new(Arc::clone(&manager)));
        let rows = Arc::new(SqliteRowStore::new(Arc::clone(&manager)));
        let jobs = Arc::new(SqliteSyncJobRepository::new(Arc::clone(&manager)));
        let cache_repo = Arc::new(SqliteCacheRepository::new(Arc::clone(&manager)));
        let configs = Arc::new(SqliteDashboardConfigRepository::new(Arc::clone(&manager)));
        let charts = Arc::new(SqliteCustomChartRepository::new(Arc::clone(&manager)));

        let http = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .max_attempts(1)
            .build()
            .expect("http client should build");
        let factory =
            Arc::new(SourceConnectorFactory::with_http_client(http, Duration::from_secs(5)));
        let generator = Arc::new(FixedGenerator::new(generated));

        let sources = SourceService::new(source_repo.clone(), table_repo.clone(), factory.clone());
        let sync = SyncEngine::new(
            source_repo.clone(),
            table_repo.clone(),
            rows.clone(),
            jobs,
            factory,
        )
        .with_batch_size(batch_size);
        let engine = Arc::new(AggregationEngine::new(rows.clone()));
        let cache = Arc::new(CacheService::new(cache_repo, source_repo, Arc::clone(&engine)));
        let discovery = Arc::new(DiscoveryService::new(table_repo, rows.clone()));
        let orchestrator =
            DashboardOrchestrator::new(Arc::clone(&cache), discovery, configs, generator.clone());
        let custom_charts = CustomChartService::new(charts, engine);

        Self {
            _temp_dir: temp_dir,
            manager,
            rows,
            generator,
            sources,
            sync,
            cache,
            orchestrator,
            custom_charts,
        }
    }

    /// Execute a batch of SQL statements against the database.
    pub fn execute_batch(&self, sql: &str) {
        let conn = self
            .manager
            .get_connection()
            .expect("connection should be available for execute_batch");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    /// Count rows in a local table.
    pub fn count(&self, table: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count query should succeed")
    }
}
