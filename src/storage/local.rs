// src/storage/local.rs

//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {output_dir}/json/ranking_{year}.json
//! {snapshot_dir}/index_{collection}_{timestamp}.json
//! {ranks_dir}/ranks_{timestamp}.json
//! ```
//!
//! Writes go through a temp file and a rename so a crash never leaves a
//! half-written document behind.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CaptureDocument, OutputDocument, PathsConfig, RankEntry};
use crate::storage::RankStorage;
use crate::utils::file_timestamp;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    paths: PathsConfig,
}

impl LocalStorage {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    /// Directory holding ranked output documents.
    pub fn output_json_dir(&self) -> PathBuf {
        self.paths.output_dir.join("json")
    }

    /// Default output document path for a given year.
    pub fn output_path(&self, year: i32) -> PathBuf {
        self.output_json_dir().join(format!("ranking_{year}.json"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Newest `{prefix}*.json` in `dir` by modification time.
    ///
    /// Name order breaks mtime ties so the choice is deterministic.
    async fn latest_matching(&self, dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Snapshot directory {} does not exist", dir.display());
                return Ok(None);
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(prefix) || !name.ends_with(".json") {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified()?;
            let path = entry.path();

            let is_newer = match &newest {
                None => true,
                Some((best_time, best_path)) => {
                    (modified, &path) > (*best_time, best_path)
                }
            };
            if is_newer {
                newest = Some((modified, path));
            }
        }

        Ok(newest.map(|(_, path)| path))
    }
}

#[async_trait]
impl RankStorage for LocalStorage {
    async fn save_output(&self, document: &OutputDocument) -> Result<PathBuf> {
        let path = self.output_path(document.metadata.year);
        self.write_json(&path, document).await?;
        log::info!(
            "Output written to {} ({} normal, {} restricted)",
            path.display(),
            document.metadata.normal_count,
            document.metadata.restricted_count
        );
        Ok(path)
    }

    async fn load_output(&self, path: Option<&Path>) -> Result<OutputDocument> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.output_path(Local::now().year()),
        };
        self.read_json(&path).await?.ok_or_else(|| {
            AppError::config(format!("output document not found at {}", path.display()))
        })
    }

    async fn save_capture(&self, document: &CaptureDocument) -> Result<PathBuf> {
        let stamp = file_timestamp(document.metadata.fetch_date.with_timezone(&Local));
        let path = self
            .paths
            .snapshot_dir
            .join(format!("index_{}_{}.json", document.index_info.id, stamp));
        self.write_json(&path, document).await?;
        log::info!(
            "Captured {} subjects to {}",
            document.subjects.len(),
            path.display()
        );
        Ok(path)
    }

    async fn save_ranks(&self, entries: &[RankEntry]) -> Result<PathBuf> {
        let path = self
            .paths
            .ranks_dir
            .join(format!("ranks_{}.json", file_timestamp(Local::now())));
        self.write_json(&path, entries).await?;
        log::info!("Saved {} restricted ranks to {}", entries.len(), path.display());
        Ok(path)
    }

    async fn latest_capture(&self, collection_id: u64) -> Result<Option<PathBuf>> {
        let prefix = format!("index_{collection_id}_");
        self.latest_matching(&self.paths.snapshot_dir, &prefix).await
    }

    async fn latest_ranks(&self) -> Result<Option<PathBuf>> {
        self.latest_matching(&self.paths.ranks_dir, "ranks_").await
    }

    async fn read_value(&self, path: &Path) -> Result<Value> {
        self.read_json(path).await?.ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{CaptureMetadata, CollectionInfo, OutputMetadata};

    fn storage_in(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(PathsConfig {
            output_dir: tmp.path().join("output"),
            snapshot_dir: tmp.path().join("output/indices"),
            ranks_dir: tmp.path().join("output/ranks"),
        })
    }

    fn touch(path: &Path, age_secs: u64) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"[]").unwrap();
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);
        let path = tmp.path().join("nested/test.json");

        storage.write_json(&path, &vec![1, 2, 3]).await.unwrap();
        let data: Option<Vec<u32>> = storage.read_json(&path).await.unwrap();
        assert_eq!(data, Some(vec![1, 2, 3]));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);

        let data: Option<Value> = storage.read_json(&tmp.path().join("nope.json")).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_latest_capture_by_mtime() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);
        let dir = tmp.path().join("output/indices");

        // names sort the other way round to prove mtime wins
        touch(&dir.join("index_74044_20990101_000000.json"), 300);
        touch(&dir.join("index_74044_20000101_000000.json"), 10);
        touch(&dir.join("index_11111_20500101_000000.json"), 0);

        let latest = storage.latest_capture(74044).await.unwrap().unwrap();
        assert!(latest.ends_with("index_74044_20000101_000000.json"));
    }

    #[tokio::test]
    async fn test_latest_in_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);

        assert!(storage.latest_ranks().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_output_roundtrip_via_default_path() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);
        let year = Local::now().year();

        let document = OutputDocument {
            metadata: OutputMetadata {
                fetch_date: Utc::now(),
                year,
                total: 0,
                normal_count: 0,
                restricted_count: 0,
                digest: String::new(),
            },
            normal: Vec::new(),
            restricted: Vec::new(),
        };

        let path = storage.save_output(&document).await.unwrap();
        assert_eq!(path, storage.output_path(year));

        let loaded = storage.load_output(None).await.unwrap();
        assert_eq!(loaded.metadata.year, year);
    }

    #[tokio::test]
    async fn test_capture_file_name() {
        let tmp = TempDir::new().unwrap();
        let storage = storage_in(&tmp);

        let document = CaptureDocument {
            index_info: CollectionInfo {
                id: 74044,
                ..CollectionInfo::default()
            },
            subjects: Vec::new(),
            metadata: CaptureMetadata {
                fetch_date: Utc::now(),
                total_subjects: 0,
                subject_type: 2,
            },
        };

        let path = storage.save_capture(&document).await.unwrap();
        assert_eq!(storage.latest_capture(74044).await.unwrap(), Some(path));
    }
}
