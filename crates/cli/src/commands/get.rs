//! `get` command implementation.
//!
//! Prints a single cached value.

use chaincache_core::{CacheConfig, DiskCache, Namespace};
use clap::Args;
use serde_json::Value;

use crate::error::{CliError, to_json};

/// Arguments for the `get` command.
#[derive(Debug, Clone, Args)]
pub struct GetParams {
    /// Namespace (chain id) of the cache.
    pub namespace: String,

    /// Partition holding the key.
    pub partition: String,

    /// Key to look up.
    pub key: String,
}

/// Implementation of the `get` command.
pub async fn get_impl(config: &CacheConfig, params: GetParams) -> Result<String, CliError> {
    let namespace: Namespace = params.namespace.parse()?;
    let cache = DiskCache::open(namespace, config).await?;

    let value: Value = cache
        .get(&params.partition, &params.key)
        .await?
        .ok_or_else(|| CliError::CacheMiss(format!("{}/{}", params.partition, params.key)))?;

    to_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(key: &str) -> GetParams {
        GetParams { namespace: "1".into(), partition: "contracts".into(), key: key.into() }
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let root = tempfile::tempdir().unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let result = get_impl(&config, params("0xABC")).await;
        assert!(matches!(result, Err(CliError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("contracts.json"), r#"{"0xABC": {"name": "Proxy"}}"#).unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let output = get_impl(&config, params("0xABC")).await.unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!({"name": "Proxy"}));
    }

    #[tokio::test]
    async fn test_get_impl_corrupt_partition() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("1");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("contracts.json"), "{").unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let result = get_impl(&config, params("0xABC")).await;
        assert!(matches!(result, Err(CliError::Cache(chaincache_core::Error::PartitionLoad { .. }))));
    }
}
