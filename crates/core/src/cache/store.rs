//! On-disk partition files.
//!
//! Every filesystem access of the cache goes through this module. A
//! partition lives at `<dir>/<partition>.json` and is always replaced
//! wholesale: the new body is written to `<partition>.json.tmp` and renamed
//! over the target, so a reader never observes a half-written object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::fs;

use super::namespace::validate_name;
use crate::Error;

/// In-memory contents of one partition.
pub type Entries = Map<String, Value>;

const EXTENSION: &str = "json";

/// Path of the file backing `partition` inside `dir`.
pub fn partition_path(dir: &Path, partition: &str) -> PathBuf {
    dir.join(format!("{partition}.{EXTENSION}"))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Create `dir` and any missing parents.
pub async fn ensure_dir(dir: &Path) -> Result<(), Error> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::DirectoryInit { path: dir.to_path_buf(), reason: e.to_string() })
}

/// Read the raw bytes of a partition file.
///
/// Returns `Ok(None)` when the file does not exist. Encoding is not checked
/// here; bytes that are not UTF-8 JSON fail in [`decode`].
pub async fn read_raw(dir: &Path, partition: &str) -> Result<Option<Vec<u8>>, Error> {
    match fs::read(partition_path(dir, partition)).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::load(partition, e)),
    }
}

/// Parse a partition body. Anything other than a JSON object is rejected.
pub fn decode(partition: &str, raw: &[u8]) -> Result<Entries, Error> {
    serde_json::from_slice(raw).map_err(|e| Error::load(partition, e))
}

/// Serialize a partition the way it is stored on disk (2-space indent).
pub fn encode(partition: &str, entries: &Entries) -> Result<String, Error> {
    serde_json::to_string_pretty(entries).map_err(|e| Error::write(partition, e))
}

/// Read and parse a partition file.
pub async fn read_partition(dir: &Path, partition: &str) -> Result<Option<Entries>, Error> {
    match read_raw(dir, partition).await? {
        Some(raw) => decode(partition, &raw).map(Some),
        None => Ok(None),
    }
}

/// Atomically replace the partition file with `body`.
pub async fn write_raw(dir: &Path, partition: &str, body: String) -> Result<(), Error> {
    fs::create_dir_all(dir).await.map_err(|e| Error::write(partition, e))?;

    let path = partition_path(dir, partition);
    let temp_path = sibling(&path, ".tmp");

    fs::write(&temp_path, body)
        .await
        .map_err(|e| Error::write(partition, format!("failed to write temp file: {e}")))?;

    if let Err(e) = fs::rename(&temp_path, &path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(Error::write(partition, format!("failed to rename temp file: {e}")));
    }

    Ok(())
}

/// Move an unreadable partition file aside so it is not overwritten.
///
/// Returns the backup path `<partition>.json.corrupt.<UTC timestamp>`.
/// Earlier backups are never replaced; a name already taken gets a numeric
/// suffix.
pub async fn quarantine(dir: &Path, partition: &str) -> Result<PathBuf, Error> {
    let path = partition_path(dir, partition);
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let base = sibling(&path, &format!(".corrupt.{stamp}"));

    let mut backup = base.clone();
    let mut n = 0u32;
    while fs::try_exists(&backup).await.map_err(|e| Error::load(partition, e))? {
        n += 1;
        backup = sibling(&base, &format!(".{n}"));
    }

    fs::rename(&path, &backup).await.map_err(|e| Error::load(partition, e))?;
    Ok(backup)
}

/// Names of the partitions stored in `dir`, sorted.
///
/// A missing directory has no partitions. Temp and quarantined files are
/// skipped.
pub async fn list_partitions(dir: &Path) -> Result<Vec<String>, Error> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(format!("{}: {e}", dir.display()))),
    };

    let mut names = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| Error::Io(format!("{}: {e}", dir.display())))?
    {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
            continue;
        }
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if let (true, Some(stem)) = (is_file, path.file_stem().and_then(|s| s.to_str())) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Delete a partition file. Returns false if it did not exist.
pub async fn remove_partition(dir: &Path, partition: &str) -> Result<bool, Error> {
    validate_name(partition)?;
    match fs::remove_file(partition_path(dir, partition)).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::write(partition, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(value: Value) -> Entries {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_read_missing_partition() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_partition(dir.path(), "contracts").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_dir_and_pretty_prints() {
        let dir = tempfile::tempdir().unwrap();
        let ns_dir = dir.path().join("1");
        let data = entries(json!({"0xABC": {"name": "Proxy"}}));

        write_raw(&ns_dir, "contracts", encode("contracts", &data).unwrap()).await.unwrap();

        let raw = std::fs::read_to_string(ns_dir.join("contracts.json")).unwrap();
        assert_eq!(raw, "{\n  \"0xABC\": {\n    \"name\": \"Proxy\"\n  }\n}");
        assert!(!ns_dir.join("contracts.json.tmp").exists());
        assert_eq!(read_partition(&ns_dir, "contracts").await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocks.json"), "[1, 2, 3]").unwrap();

        let result = read_partition(dir.path(), "blocks").await;
        assert!(matches!(result, Err(Error::PartitionLoad { partition, .. }) if partition == "blocks"));
    }

    #[tokio::test]
    async fn test_quarantine_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocks.json"), "{not json").unwrap();

        let backup = quarantine(dir.path(), "blocks").await.unwrap();
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("blocks.json.corrupt."), "{name}");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "{not json");
        assert!(!dir.path().join("blocks.json").exists());
    }

    #[tokio::test]
    async fn test_quarantine_never_replaces_earlier_backup() {
        let dir = tempfile::tempdir().unwrap();

        std::fs::write(dir.path().join("blocks.json"), "first-garbage").unwrap();
        let first = quarantine(dir.path(), "blocks").await.unwrap();
        std::fs::write(dir.path().join("blocks.json"), "second-garbage").unwrap();
        let second = quarantine(dir.path(), "blocks").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "first-garbage");
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "second-garbage");
        assert!(list_partitions(dir.path()).await.unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode("blocks", &[0xff, 0xfe, 0x7b]);
        assert!(matches!(result, Err(Error::PartitionLoad { partition, .. }) if partition == "blocks"));
    }

    #[tokio::test]
    async fn test_list_partitions_skips_side_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["storage.json", "contracts.json", "a.json.tmp", "b.json.corrupt.20261018T120000.000000Z", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let names = list_partitions(dir.path()).await.unwrap();
        assert_eq!(names, vec!["contracts".to_string(), "storage".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let names = list_partitions(&dir.path().join("absent")).await.unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn test_remove_partition() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("storage.json"), "{}").unwrap();

        assert!(remove_partition(dir.path(), "storage").await.unwrap());
        assert!(!remove_partition(dir.path(), "storage").await.unwrap());
        assert!(matches!(remove_partition(dir.path(), "../x").await, Err(Error::InvalidName(_))));
    }
}
