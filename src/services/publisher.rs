// src/services/publisher.rs

//! Ranking publisher.
//!
//! Upserts one collection entry per ranked item, in ascending rank order.
//! A failing item is recorded and skipped; only credential failures abort
//! the batch.

use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::models::{CollectionEntry, Config};
use crate::services::CatalogApi;
use crate::utils::{RetryPolicy, pause};

/// One item ready for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishEntry {
    pub id: u64,
    pub rank_position: u32,
    /// Annotation token, e.g. `12 ↑3`
    pub comment: String,
    pub display_name: String,
}

impl PublishEntry {
    fn to_collection_entry(&self) -> CollectionEntry {
        CollectionEntry {
            sort: self.rank_position,
            comment: self.comment.clone(),
        }
    }
}

/// A single item that could not be published.
#[derive(Debug, Clone, Serialize)]
pub struct PublishFailure {
    pub id: u64,
    pub rank_position: u32,
    pub error: String,
}

/// Aggregate outcome of a publish run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<PublishFailure>,
}

impl PublishSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Service uploading ranked entries to a target collection.
pub struct Publisher<'a> {
    api: &'a dyn CatalogApi,
    collection_id: u64,
    policy: RetryPolicy,
    request_delay: Duration,
}

impl<'a> Publisher<'a> {
    pub fn new(
        api: &'a dyn CatalogApi,
        collection_id: u64,
        policy: RetryPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            api,
            collection_id,
            policy,
            request_delay,
        }
    }

    pub fn from_config(api: &'a dyn CatalogApi, config: &Config) -> Self {
        Self::new(
            api,
            config.collections.target_id,
            RetryPolicy::from_config(&config.retry),
            config.retry.request_delay(),
        )
    }

    /// Upsert a single entry, retrying per policy.
    pub async fn publish_one(&self, entry: &PublishEntry) -> Result<()> {
        let api = self.api;
        let collection_id = self.collection_id;
        let subject_id = entry.id;
        let body = entry.to_collection_entry();
        let body = &body;
        let operation = format!("upsert subject {subject_id}");

        self.policy
            .run(&operation, move || {
                api.upsert_collection_subject(collection_id, subject_id, body)
            })
            .await
    }

    /// Publish every entry in ascending `rank_position` order.
    ///
    /// Per-item failures are counted and the batch continues. An
    /// authentication failure is returned as an error since no later call
    /// can succeed either.
    pub async fn publish_all(&self, entries: &[PublishEntry]) -> Result<PublishSummary> {
        let mut ordered: Vec<&PublishEntry> = entries.iter().collect();
        ordered.sort_by_key(|e| e.rank_position);

        let total = ordered.len();
        let mut summary = PublishSummary::default();

        log::info!(
            "Publishing {} entries to collection {}",
            total,
            self.collection_id
        );

        for (idx, entry) in ordered.into_iter().enumerate() {
            if idx > 0 {
                pause(self.request_delay).await;
            }

            log::info!(
                "[{}/{}] {} (id {}, rank {}, {})",
                idx + 1,
                total,
                entry.display_name,
                entry.id,
                entry.rank_position,
                entry.comment
            );

            match self.publish_one(entry).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) if e.is_auth() => {
                    log::error!("Aborting publish at subject {}: {}", entry.id, e);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("Failed to publish subject {}: {}", entry.id, e);
                    summary.failed += 1;
                    summary.failures.push(PublishFailure {
                        id: entry.id,
                        rank_position: entry.rank_position,
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Publish complete: {} succeeded, {} failed",
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }
}
