//! Application context - dependency injection container

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashsync_core::{
    AggregationEngine, CacheService, ConfigGenerator, CustomChartService, DashboardOrchestrator,
    DiscoveryService, SourceService, SyncEngine,
};
use dashsync_domain::{Config, DashSyncError, DiscoveredTable, GeneratedConfig, Result, SyncSummary};
use dashsync_infra::database::{
    DbManager, SqliteCacheRepository, SqliteCustomChartRepository,
    SqliteDashboardConfigRepository, SqliteRowStore, SqliteSourceRepository,
    SqliteSyncJobRepository, SqliteSyncedTableRepository,
};
use dashsync_infra::integrations::openai::OpenAIClient;
use dashsync_infra::{HttpClient, SourceConnectorFactory};
use tracing::{info, warn};

use crate::utils::health::{ComponentHealth, HealthStatus};
use crate::utils::logging::log_sync_summary;

/// Timeout for a single generator request. Completions are slow.
const GENERATOR_TIMEOUT: Duration = Duration::from_secs(120);

/// Application context holding every wired service.
///
/// Built once at startup; services are shared through `Arc` so callers can
/// hand them to tasks.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub sources: Arc<SourceService>,
    pub sync: Arc<SyncEngine>,
    pub engine: Arc<AggregationEngine>,
    pub cache: Arc<CacheService>,
    pub discovery: Arc<DiscoveryService>,
    pub orchestrator: Arc<DashboardOrchestrator>,
    pub custom_charts: Arc<CustomChartService>,
    generator_configured: bool,
    closed: AtomicBool,
}

impl AppContext {
    /// Create a context from `.env`, environment variables and config files.
    pub async fn new() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(error = %err, "no .env file loaded");
        }
        let config = dashsync_infra::config::load()?;
        Self::new_with_config(config).await
    }

    /// Create a context from an explicit configuration.
    ///
    /// Tests use this to point at a temporary database.
    pub async fn new_with_config(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let source_repo = Arc::new(SqliteSourceRepository::new(Arc::clone(&db)));
        let table_repo = Arc::new(SqliteSyncedTableRepository::new(Arc::clone(&db)));
        let rows = Arc::new(SqliteRowStore::new(Arc::clone(&db)));
        let jobs = Arc::new(SqliteSyncJobRepository::new(Arc::clone(&db)));
        let cache_repo = Arc::new(SqliteCacheRepository::new(Arc::clone(&db)));
        let config_repo = Arc::new(SqliteDashboardConfigRepository::new(Arc::clone(&db)));
        let chart_repo = Arc::new(SqliteCustomChartRepository::new(Arc::clone(&db)));

        let connectors = Arc::new(SourceConnectorFactory::new(&config.sync)?);

        let sources = Arc::new(SourceService::new(
            source_repo.clone(),
            table_repo.clone(),
            connectors.clone(),
        ));
        let sync = Arc::new(
            SyncEngine::new(source_repo.clone(), table_repo.clone(), rows.clone(), jobs, connectors)
                .with_batch_size(config.sync.batch_size)
                .with_fetch_limit(config.sync.fetch_limit),
        );
        let engine = Arc::new(AggregationEngine::new(rows.clone()));
        let cache = Arc::new(CacheService::new(cache_repo, source_repo, Arc::clone(&engine)));
        let discovery = Arc::new(DiscoveryService::new(table_repo, rows));

        let (generator, generator_configured) = build_generator(&config)?;
        let orchestrator = Arc::new(DashboardOrchestrator::new(
            Arc::clone(&cache),
            Arc::clone(&discovery),
            config_repo,
            generator,
        ));
        let custom_charts = Arc::new(CustomChartService::new(chart_repo, Arc::clone(&engine)));

        info!(
            db_path = %db.path().display(),
            batch_size = config.sync.batch_size,
            generator_configured,
            "application context ready"
        );

        Ok(Self {
            config,
            db,
            sources,
            sync,
            engine,
            cache,
            discovery,
            orchestrator,
            custom_charts,
            generator_configured,
            closed: AtomicBool::new(false),
        })
    }

    /// Whether an API key for the config generator was supplied.
    pub fn generator_configured(&self) -> bool {
        self.generator_configured
    }

    /// Sync every registered table of a source and log the outcome.
    pub async fn sync_source(&self, source_id: &str) -> Result<SyncSummary> {
        let summary = self.sync.sync_all(source_id).await?;
        log_sync_summary(&summary);
        Ok(summary)
    }

    /// Perform health checks on the database and the config generator.
    pub async fn health_check(&self) -> HealthStatus {
        if self.closed.load(Ordering::SeqCst) {
            return HealthStatus::unhealthy("application context is shut down");
        }

        let generator = if self.generator_configured {
            ComponentHealth::healthy("config_generator").optional()
        } else {
            ComponentHealth::unhealthy("config_generator", "no API key configured").optional()
        };

        HealthStatus::new()
            .add_component(self.check_database_health().await)
            .add_component(generator)
            .finish()
    }

    /// Run the blocking database probe off the async runtime.
    async fn check_database_health(&self) -> ComponentHealth {
        let db = Arc::clone(&self.db);
        match tokio::task::spawn_blocking(move || db.health_check()).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => {
                warn!(error = %e, "database health check failed");
                ComponentHealth::unhealthy("database", format!("query failed: {e}"))
            }
            Err(e) => {
                tracing::error!(error = %e, "database health check task panicked");
                ComponentHealth::unhealthy("database", format!("task panic: {e}"))
            }
        }
    }

    /// Checkpoint the database. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("shutdown called on AppContext");
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.close())
            .await
            .map_err(|e| DashSyncError::Internal(format!("shutdown task failed: {e}")))?
    }
}

fn build_generator(config: &Config) -> Result<(Arc<dyn ConfigGenerator>, bool)> {
    if config.ai.api_key.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        warn!("no AI API key configured; dashboards need a stored configuration");
        let placeholder: Arc<dyn ConfigGenerator> = Arc::new(UnconfiguredGenerator);
        return Ok((placeholder, false));
    }

    let http = HttpClient::builder().timeout(GENERATOR_TIMEOUT).build()?;
    let client = OpenAIClient::from_config(&config.ai, http)?;
    info!(model = client.model(), "config generator configured");
    let generator: Arc<dyn ConfigGenerator> = Arc::new(client);
    Ok((generator, true))
}

/// Placeholder generator used when no API key is configured.
struct UnconfiguredGenerator;

#[async_trait]
impl ConfigGenerator for UnconfiguredGenerator {
    async fn generate(&self, _tables: &[DiscoveredTable]) -> Result<GeneratedConfig> {
        Err(DashSyncError::Config(
            "AI API key not configured; set AI_API_KEY to generate dashboards".into(),
        ))
    }
}
