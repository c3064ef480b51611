//! Document-store connector placeholder
//!
//! Mongo sources can be registered and their URI validated, but reading rows
//! is not available for this source family.

use async_trait::async_trait;
use dashsync_core::SourceConnector;
use dashsync_domain::{DashSyncError, Document, Result};
use url::Url;

pub struct MongoConnector {
    host: String,
}

impl MongoConnector {
    pub fn new(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| DashSyncError::Connection(format!("invalid mongodb URI: {e}")))?;
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| DashSyncError::Connection("mongodb URI has no host".into()))?;
        Ok(Self { host: host.to_string() })
    }
}

#[async_trait]
impl SourceConnector for MongoConnector {
    async fn test(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_all(&self, table: &str, _limit: Option<usize>) -> Result<Vec<Document>> {
        Err(DashSyncError::Unsupported(format!(
            "reading collection '{table}' from mongodb host {} is not supported",
            self.host
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_is_unsupported() {
        let connector =
            MongoConnector::new("mongodb://user:pw@cluster.test:27017/app").expect("valid uri");
        connector.test().await.expect("test passes for a valid uri");
        let err = connector.fetch_all("events", None).await.unwrap_err();
        assert_eq!(err.label(), "unsupported");
    }

    #[test]
    fn rejects_uri_without_host() {
        assert!(MongoConnector::new("mongodb://").is_err());
    }
}
