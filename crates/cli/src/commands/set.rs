//! `set` command implementation.
//!
//! Stores a JSON value and flushes before returning.

use chaincache_core::{CacheConfig, DiskCache, Namespace};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CliError, to_json};

/// Arguments for the `set` command.
#[derive(Debug, Clone, Args)]
pub struct SetParams {
    /// Namespace (chain id) of the cache.
    pub namespace: String,

    /// Partition to write into.
    pub partition: String,

    /// Key to store under.
    pub key: String,

    /// Value as a JSON document (quote plain strings: '"0x01"').
    pub value: String,
}

/// Output from the `set` command.
#[derive(Debug, Serialize)]
pub struct SetOutput {
    pub partition: String,
    pub key: String,
    /// Whether a value was replaced.
    pub replaced: bool,
}

/// Implementation of the `set` command.
pub async fn set_impl(config: &CacheConfig, params: SetParams) -> Result<String, CliError> {
    let value: Value = serde_json::from_str(&params.value)
        .map_err(|e| CliError::InvalidInput(format!("value is not valid JSON: {e}")))?;

    let namespace: Namespace = params.namespace.parse()?;
    let cache = DiskCache::open(namespace, config).await?;

    let replaced = cache.contains(&params.partition, &params.key).await?;
    cache.set(&params.partition, &params.key, &value).await?;
    cache.shutdown().await?;

    to_json(&SetOutput { partition: params.partition, key: params.key, replaced })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: &str) -> SetParams {
        SetParams { namespace: "1".into(), partition: "contracts".into(), key: "0xABC".into(), value: value.into() }
    }

    #[tokio::test]
    async fn test_set_impl_persists() {
        let root = tempfile::tempdir().unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let output = set_impl(&config, params(r#"{"name": "Proxy"}"#)).await.unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(output["replaced"], json!(false));

        let raw = std::fs::read_to_string(root.path().join("1/contracts.json")).unwrap();
        let on_disk: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, json!({"0xABC": {"name": "Proxy"}}));

        let output = set_impl(&config, params(r#"{"name": "Upgraded"}"#)).await.unwrap();
        let output: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(output["replaced"], json!(true));
    }

    #[tokio::test]
    async fn test_set_impl_rejects_invalid_json() {
        let root = tempfile::tempdir().unwrap();
        let config = CacheConfig::default().with_root_dir(root.path());

        let result = set_impl(&config, params("Proxy")).await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        assert!(!root.path().join("1").exists());
    }
}
