// src/pipeline/capture.rs

//! Snapshot capture.
//!
//! Records the previous period's collection so the next publish run can
//! diff against it.

use std::path::PathBuf;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{CaptureDocument, CaptureMetadata, Config};
use crate::services::{CatalogApi, RankingFetcher};
use crate::storage::RankStorage;
use crate::storage::snapshot::extract_description_ranks;
use crate::utils::RetryPolicy;

/// Files written by a capture run.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    pub collection_id: u64,
    pub subject_count: usize,
    pub snapshot_path: PathBuf,
    /// `None` when the description carried no rank lines
    pub ranks_path: Option<PathBuf>,
    pub restricted_count: usize,
}

/// Capture the previous-period collection into the snapshot directories.
pub async fn run_capture(
    config: &Config,
    api: &dyn CatalogApi,
    storage: &dyn RankStorage,
) -> Result<CaptureSummary> {
    config.validate()?;
    let collection_id = config.collections.previous_id;
    log::info!("Capturing collection {}", collection_id);

    let policy = RetryPolicy::from_config(&config.retry);
    let info = policy
        .run(&format!("get collection {collection_id}"), move || {
            api.get_collection(collection_id)
        })
        .await?
        .ok_or_else(|| {
            AppError::validation(format!("collection {collection_id} not found"))
        })?;

    log::info!("Collection {}: {}", info.id, info.title);

    let fetcher = RankingFetcher::from_config(api, config);
    let subjects = fetcher
        .fetch_collection_subjects(
            collection_id,
            config.query.subject_type,
            config.query.page_size,
        )
        .await?;

    let ranks = extract_description_ranks(&info.desc, &config.collections.subject_url_prefix)?;

    let document = CaptureDocument {
        metadata: CaptureMetadata {
            fetch_date: Utc::now(),
            total_subjects: subjects.len(),
            subject_type: config.query.subject_type,
        },
        index_info: info,
        subjects,
    };
    let snapshot_path = storage.save_capture(&document).await?;

    let ranks_path = if ranks.is_empty() {
        log::warn!("No restricted ranks found in the collection description");
        None
    } else {
        Some(storage.save_ranks(&ranks).await?)
    };

    Ok(CaptureSummary {
        collection_id,
        subject_count: document.subjects.len(),
        snapshot_path,
        ranks_path,
        restricted_count: ranks.len(),
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::models::{CollectionInfo, CollectionSubject, PathsConfig};
    use crate::services::stub::StubCatalog;
    use crate::storage::{LocalStorage, Namespace, SnapshotStore};

    fn config(tmp: &TempDir) -> Config {
        let mut config = Config::default();
        config.retry.base_delay_ms = 0;
        config.retry.request_delay_ms = 0;
        config.query.page_size = 2;
        config.paths = PathsConfig {
            output_dir: tmp.path().join("output"),
            snapshot_dir: tmp.path().join("indices"),
            ranks_dir: tmp.path().join("ranks"),
        };
        config
    }

    fn previous_collection(desc: &str) -> (CollectionInfo, Vec<CollectionSubject>) {
        let info = CollectionInfo {
            id: 74044,
            title: "Last year".into(),
            desc: desc.into(),
            ..CollectionInfo::default()
        };
        let subjects = (1..=5)
            .map(|id| CollectionSubject {
                id,
                comment: format!("{} -", 6 - id),
                ..CollectionSubject::default()
            })
            .collect();
        (info, subjects)
    }

    #[tokio::test]
    async fn test_capture_feeds_next_load() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let (info, subjects) =
            previous_collection("1 NEW [url=https://bgm.tv/subject/900]Hidden[/url]");
        let api = StubCatalog::default().with_collection(info, subjects);
        let storage = LocalStorage::new(config.paths.clone());

        let summary = run_capture(&config, &api, &storage).await.unwrap();
        assert_eq!(summary.subject_count, 5);
        assert_eq!(summary.restricted_count, 1);
        assert!(summary.ranks_path.is_some());

        let store = SnapshotStore::load(&storage, 74044).await;
        assert_eq!(store.lookup(Namespace::Primary, 1), Some(5));
        assert_eq!(store.lookup(Namespace::Primary, 5), Some(1));
        assert_eq!(store.lookup(Namespace::Restricted, 900), Some(1));
    }

    #[tokio::test]
    async fn test_capture_without_description_ranks() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let (info, subjects) = previous_collection("plain text");
        let api = StubCatalog::default().with_collection(info, subjects);
        let storage = LocalStorage::new(config.paths.clone());

        let summary = run_capture(&config, &api, &storage).await.unwrap();
        assert!(summary.ranks_path.is_none());
        assert!(!tmp.path().join("ranks").exists());
    }

    #[tokio::test]
    async fn test_missing_collection_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config(&tmp);
        let api = StubCatalog::default();
        let storage = LocalStorage::new(config.paths.clone());

        let result = run_capture(&config, &api, &storage).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
