//! `purge` command implementation.
//!
//! Deletes partition files so the next crawl recomputes them.

use chaincache_core::cache::store;
use chaincache_core::{CacheConfig, Namespace};
use clap::Args;
use serde::Serialize;

use crate::error::{CliError, to_json};

/// Arguments for the `purge` command.
#[derive(Debug, Clone, Args)]
pub struct PurgeParams {
    /// Namespace (chain id) of the cache.
    pub namespace: String,

    /// Only delete this partition. Without it every partition is deleted.
    #[arg(long)]
    pub partition: Option<String>,
}

/// Output from the `purge` command.
#[derive(Debug, Serialize)]
pub struct PurgeOutput {
    /// Number of partition files deleted.
    pub deleted: u64,
}

/// Implementation of the `purge` command.
pub async fn purge_impl(config: &CacheConfig, params: PurgeParams) -> Result<String, CliError> {
    let namespace: Namespace = params.namespace.parse()?;
    let dir = config.root_dir.join(namespace.as_str());

    let targets = match params.partition {
        Some(partition) => vec![partition],
        None => store::list_partitions(&dir).await?,
    };

    let mut deleted = 0u64;
    for partition in targets {
        if store::remove_partition(&dir, &partition).await? {
            tracing::info!(namespace = %namespace, partition = %partition, "partition purged");
            deleted += 1;
        }
    }

    to_json(&PurgeOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn seed(root: &std::path::Path) {
        let dir = root.join("1");
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["contracts", "storage", "code"] {
            std::fs::write(dir.join(format!("{name}.json")), "{}").unwrap();
        }
    }

    fn deleted(output: &str) -> u64 {
        let output: Value = serde_json::from_str(output).unwrap();
        output["deleted"].as_u64().unwrap()
    }

    #[tokio::test]
    async fn test_purge_single_partition() {
        let root = tempfile::tempdir().unwrap();
        seed(root.path());
        let config = CacheConfig::default().with_root_dir(root.path());

        let params = PurgeParams { namespace: "1".into(), partition: Some("storage".into()) };
        assert_eq!(deleted(&purge_impl(&config, params.clone()).await.unwrap()), 1);
        assert_eq!(deleted(&purge_impl(&config, params).await.unwrap()), 0);
        assert!(root.path().join("1/contracts.json").exists());
    }

    #[tokio::test]
    async fn test_purge_namespace() {
        let root = tempfile::tempdir().unwrap();
        seed(root.path());
        let config = CacheConfig::default().with_root_dir(root.path());

        let params = PurgeParams { namespace: "1".into(), partition: None };
        assert_eq!(deleted(&purge_impl(&config, params).await.unwrap()), 3);
    }

    #[tokio::test]
    async fn test_purge_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let params = PurgeParams { namespace: "1".into(), partition: Some("../etc".into()) };
        assert!(matches!(purge_impl(&config, params).await, Err(CliError::Cache(_))));
    }
}
