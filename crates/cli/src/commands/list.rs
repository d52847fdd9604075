//! `list` command implementation.

use chaincache_core::cache::store;
use chaincache_core::{CacheConfig, Namespace};
use clap::Args;
use serde::Serialize;

use crate::error::{CliError, to_json};

/// Arguments for the `list` command.
#[derive(Debug, Clone, Args)]
pub struct ListParams {
    /// Namespace (chain id) of the cache.
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: usize,
}

/// Output from the `list` command.
#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub namespace: String,
    pub dir: String,
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the `list` command.
///
/// Reads the files directly; a corrupt partition fails the listing.
pub async fn list_impl(config: &CacheConfig, params: ListParams) -> Result<String, CliError> {
    let namespace: Namespace = params.namespace.parse()?;
    let dir = config.root_dir.join(namespace.as_str());

    let mut partitions = Vec::new();
    for name in store::list_partitions(&dir).await? {
        let entries = store::read_partition(&dir, &name).await?.map_or(0, |e| e.len());
        partitions.push(PartitionSummary { name, entries });
    }

    to_json(&ListOutput { namespace: namespace.to_string(), dir: dir.display().to_string(), partitions })
}
