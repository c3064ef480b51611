//! Scripted connector and configuration-generator mocks

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashsync_core::dashboard::ports::ConfigGenerator;
use dashsync_core::sources::ports::{ConnectorFactory, SourceConnector};
use dashsync_domain::{
    DashSyncError, DashboardConfig, DiscoveredTable, Document, ExternalSource, GeneratedConfig,
    Result as DomainResult,
};

/// Connector serving fixed documents per table. Unknown tables fail the
/// fetch.
#[derive(Default, Clone)]
pub struct ScriptedConnector {
    tables: Arc<Mutex<HashMap<String, Vec<Document>>>>,
}

impl ScriptedConnector {
    pub fn set_table(&self, table: &str, documents: Vec<Document>) {
        self.tables.lock().unwrap().insert(table.to_string(), documents);
    }
}

#[async_trait]
impl SourceConnector for ScriptedConnector {
    async fn test(&self) -> DomainResult<()> {
        Ok(())
    }

    async fn fetch_all(&self, table: &str, limit: Option<usize>) -> DomainResult<Vec<Document>> {
        let tables = self.tables.lock().unwrap();
        let documents = tables
            .get(table)
            .cloned()
            .ok_or_else(|| DashSyncError::Network(format!("relation {table} does not exist")))?;
        Ok(match limit {
            Some(limit) => documents.into_iter().take(limit).collect(),
            None => documents,
        })
    }
}

/// Factory handing out one shared [`ScriptedConnector`], or failing every
/// connection when `refuse` is set.
#[derive(Default, Clone)]
pub struct ScriptedConnectorFactory {
    pub connector: ScriptedConnector,
    refuse: Arc<Mutex<bool>>,
}

impl ScriptedConnectorFactory {
    pub fn refuse_connections(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }
}

#[async_trait]
impl ConnectorFactory for ScriptedConnectorFactory {
    async fn connect(&self, _source: &ExternalSource) -> DomainResult<Arc<dyn SourceConnector>> {
        if *self.refuse.lock().unwrap() {
            return Err(DashSyncError::Connection("connection refused".into()));
        }
        Ok(Arc::new(self.connector.clone()))
    }
}

/// Generator returning a fixed configuration and counting its calls.
#[derive(Clone)]
pub struct StubGenerator {
    config: Arc<Mutex<DashboardConfig>>,
    calls: Arc<AtomicUsize>,
}

impl StubGenerator {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config: Arc::new(Mutex::new(config)), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigGenerator for StubGenerator {
    async fn generate(&self, _tables: &[DiscoveredTable]) -> DomainResult<GeneratedConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedConfig {
            config: self.config.lock().unwrap().clone(),
            reasoning: "stub".into(),
            model: "stub-model".into(),
        })
    }
}
