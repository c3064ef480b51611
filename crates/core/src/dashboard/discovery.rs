//! Table discovery for configuration generation

use std::sync::Arc;

use dashsync_domain::constants::DISCOVERY_SAMPLE_ROWS;
use dashsync_domain::{DashSyncError, DiscoveredTable, Result};

use crate::sources::ports::SyncedTableRepository;
use crate::sync::ports::RowStore;

/// Lists a source's registered tables with column metadata and sample rows.
pub struct DiscoveryService {
    tables: Arc<dyn SyncedTableRepository>,
    rows: Arc<dyn RowStore>,
}

impl DiscoveryService {
    pub fn new(tables: Arc<dyn SyncedTableRepository>, rows: Arc<dyn RowStore>) -> Self {
        Self { tables, rows }
    }

    /// Fails with `NotFound` when the source has no registered tables.
    pub async fn discover(&self, source_id: &str) -> Result<Vec<DiscoveredTable>> {
        let tables = self.tables.list_tables(source_id).await?;
        if tables.is_empty() {
            return Err(DashSyncError::NotFound(format!(
                "no synced tables for source {source_id}; sync at least one table first"
            )));
        }

        let mut discovered = Vec::with_capacity(tables.len());
        for table in tables {
            let sample_rows = self.rows.sample(&table.id, DISCOVERY_SAMPLE_ROWS).await?;
            let columns = if table.columns.is_empty() {
                sample_rows.first().map(|row| row.infer_columns()).unwrap_or_default()
            } else {
                table.columns
            };
            discovered.push(DiscoveredTable {
                table_name: table.table_name,
                row_count: table.row_count,
                columns,
                sample_rows,
            });
        }
        Ok(discovered)
    }
}
