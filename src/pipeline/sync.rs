// src/pipeline/sync.rs

//! Fetch, rank and publish.
//!
//! `run_fetch` writes the ranked output document; `run_publish` diffs it
//! against the previous period and pushes it to the target collection.
//! Normal items become collection entries; restricted items are rendered
//! into the collection description.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CollectionsConfig, Config, Item, OutputDocument, OutputMetadata};
use crate::pipeline::diff::{DiffSummary, annotate};
use crate::pipeline::rank::{RankedSet, rank_and_split, ranking_digest};
use crate::services::{CatalogApi, PublishEntry, PublishSummary, Publisher, RankingFetcher};
use crate::storage::{Namespace, RankStorage, SnapshotStore};
use crate::utils::RetryPolicy;

/// Result of a fetch run.
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub ranked: RankedSet,
    pub document: OutputDocument,
    pub output_path: PathBuf,
}

/// Result of a publish run.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub summary: PublishSummary,
    pub normal_diff: DiffSummary,
    pub restricted_diff: DiffSummary,
    /// Rendered restricted list
    pub description: String,
    pub description_pushed: bool,
}

/// Wrap a ranking into its on-disk document.
pub fn build_output(ranked: &RankedSet, fetch_date: DateTime<Utc>) -> OutputDocument {
    OutputDocument {
        metadata: OutputMetadata {
            fetch_date,
            year: fetch_date.with_timezone(&Local).year(),
            total: ranked.len(),
            normal_count: ranked.normal.len(),
            restricted_count: ranked.restricted.len(),
            digest: ranked.digest(),
        },
        normal: ranked.normal.clone(),
        restricted: ranked.restricted.clone(),
    }
}

/// Fetch the full ranking, rank it and write the output document.
pub async fn run_fetch(
    config: &Config,
    api: &dyn CatalogApi,
    storage: &dyn RankStorage,
) -> Result<FetchReport> {
    config.validate()?;
    log::info!(
        "Fetching subjects of type {} ranked above {}",
        config.query.subject_type,
        config.query.min_rank
    );

    let fetcher = RankingFetcher::from_config(api, config);
    let items = fetcher.fetch_all(&config.query).await?;

    let ranked = rank_and_split(items, config.ranking.top_n);
    let document = build_output(&ranked, Utc::now());
    let output_path = storage.save_output(&document).await?;

    Ok(FetchReport {
        ranked,
        document,
        output_path,
    })
}

/// Annotate `items` against one snapshot namespace.
///
/// Every item must carry a `rank_position`. The summary's `dropped`
/// counts snapshot ids that are absent from `items`.
pub fn plan_entries(
    items: &[Item],
    store: &SnapshotStore,
    namespace: Namespace,
) -> Result<(Vec<PublishEntry>, DiffSummary)> {
    let mut summary = DiffSummary::default();
    let mut entries = Vec::with_capacity(items.len());

    for item in items {
        let position = item.rank_position.ok_or_else(|| {
            AppError::validation(format!("item {} has no rank position", item.id))
        })?;
        let annotation = annotate(position, store.lookup(namespace, item.id));
        summary.record(&annotation);

        entries.push(PublishEntry {
            id: item.id,
            rank_position: position,
            comment: annotation.token(),
            display_name: item.display_name().to_string(),
        });
    }
    entries.sort_by_key(|e| e.rank_position);

    let current: HashSet<u64> = items.iter().map(|i| i.id).collect();
    summary.dropped = store.ids(namespace).filter(|id| !current.contains(id)).count();

    Ok((entries, summary))
}

/// Render the restricted list as collection description text.
pub fn render_description(collections: &CollectionsConfig, entries: &[PublishEntry]) -> String {
    let mut lines = collections.description_header.clone();
    lines.extend(entries.iter().map(|entry| {
        format!(
            "{} [url={}{}]{}[/url]",
            entry.comment, collections.subject_url_prefix, entry.id, entry.display_name
        )
    }));
    lines.join("\r\n")
}

/// Publish an output document to the target collection.
pub async fn run_publish(
    config: &Config,
    api: &dyn CatalogApi,
    storage: &dyn RankStorage,
    document: &OutputDocument,
) -> Result<PublishReport> {
    config.validate()?;
    check_digest(document);

    let store = SnapshotStore::load(storage, config.collections.previous_id).await;
    let (normal, normal_diff) = plan_entries(&document.normal, &store, Namespace::Primary)?;
    let (restricted, restricted_diff) =
        plan_entries(&document.restricted, &store, Namespace::Restricted)?;

    log_diff("normal", &normal_diff);
    log_diff("restricted", &restricted_diff);

    let description = render_description(&config.collections, &restricted);
    let description_pushed = push_description(config, api, &description).await?;

    let summary = Publisher::from_config(api, config)
        .publish_all(&normal)
        .await?;

    for failure in &summary.failures {
        log::error!(
            "Not published: subject {} at rank {}: {}",
            failure.id,
            failure.rank_position,
            failure.error
        );
    }

    Ok(PublishReport {
        summary,
        normal_diff,
        restricted_diff,
        description,
        description_pushed,
    })
}

/// Fetch and publish in one run.
pub async fn run_sync(
    config: &Config,
    api: &dyn CatalogApi,
    storage: &dyn RankStorage,
) -> Result<PublishReport> {
    let fetched = run_fetch(config, api, storage).await?;
    run_publish(config, api, storage, &fetched.document).await
}

/// Push the description when enabled. Only auth failures are fatal.
async fn push_description(config: &Config, api: &dyn CatalogApi, description: &str) -> Result<bool> {
    let collections = &config.collections;
    if !collections.update_description {
        log::warn!(
            "Description update disabled; restricted list not pushed to collection {}",
            collections.target_id
        );
        return Ok(false);
    }

    let collection_id = collections.target_id;
    let title = collections.title.as_str();
    let policy = RetryPolicy::from_config(&config.retry);
    let result = policy
        .run(&format!("update collection {collection_id}"), move || {
            api.update_collection_info(collection_id, title, description)
        })
        .await;

    match result {
        Ok(()) => {
            log::info!("Description of collection {} updated", collection_id);
            Ok(true)
        }
        Err(e) if e.is_auth() => Err(e),
        Err(e) => {
            log::error!("Description update failed: {}", e);
            Ok(false)
        }
    }
}

/// Warn when a document's items no longer match its recorded digest.
fn check_digest(document: &OutputDocument) {
    let mut items: Vec<Item> = document
        .normal
        .iter()
        .chain(&document.restricted)
        .cloned()
        .collect();
    items.sort_by_key(|i| i.rank_position);

    let digest = ranking_digest(&items);
    if digest != document.metadata.digest {
        log::warn!(
            "Output document digest mismatch (recorded {}, computed {})",
            document.metadata.digest,
            digest
        );
    }
}

fn log_diff(group: &str, diff: &DiffSummary) {
    log::info!(
        "{}: {} new, {} up, {} down, {} unchanged, {} dropped",
        group,
        diff.new,
        diff.risen,
        diff.fallen,
        diff.unchanged,
        diff.dropped
    );
}
