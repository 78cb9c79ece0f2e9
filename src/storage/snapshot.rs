// src/storage/snapshot.rs

//! Previous-period rank positions.
//!
//! Two namespaces, loaded from the newest snapshot file of each kind. Free
//! text is parsed here and nowhere else: everything downstream sees typed
//! `Option<u32>` ranks.

use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::RankEntry;
use crate::storage::RankStorage;

/// Which snapshot a lookup consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Unrestricted items, published as collection entries
    Primary,
    /// Restricted items, published through the collection description
    Restricted,
}

/// What the last load found.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLoadReport {
    pub primary_source: Option<PathBuf>,
    pub restricted_source: Option<PathBuf>,
    /// Entries dropped because their rank could not be parsed
    pub skipped: usize,
}

/// Read-only id → previous rank mapping for both namespaces.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    primary: HashMap<u64, u32>,
    restricted: HashMap<u64, u32>,
    report: SnapshotLoadReport,
}

impl SnapshotStore {
    /// Store where every lookup is unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(
        primary: impl IntoIterator<Item = (u64, u32)>,
        restricted: impl IntoIterator<Item = (u64, u32)>,
    ) -> Self {
        Self {
            primary: primary.into_iter().collect(),
            restricted: restricted.into_iter().collect(),
            report: SnapshotLoadReport::default(),
        }
    }

    /// Load both namespaces from the newest snapshot files.
    ///
    /// Never fails: a missing or unreadable snapshot leaves its namespace
    /// empty, so every item in it is annotated as new.
    pub async fn load(storage: &dyn RankStorage, previous_id: u64) -> Self {
        let mut store = Self::empty();

        match storage.latest_capture(previous_id).await {
            Ok(Some(path)) => match storage.read_value(&path).await {
                Ok(value) => {
                    let (ranks, skipped) = parse_primary(&value);
                    log::info!(
                        "Loaded {} previous ranks from {}",
                        ranks.len(),
                        path.display()
                    );
                    store.primary = ranks;
                    store.report.skipped += skipped;
                    store.report.primary_source = Some(path);
                }
                Err(e) => log::warn!(
                    "Unreadable snapshot {}: {}; all items will be marked NEW",
                    path.display(),
                    e
                ),
            },
            Ok(None) => log::warn!(
                "No snapshot of collection {}; all items will be marked NEW",
                previous_id
            ),
            Err(e) => log::warn!("Snapshot lookup failed: {}; all items will be marked NEW", e),
        }

        match storage.latest_ranks().await {
            Ok(Some(path)) => match storage.read_value(&path).await {
                Ok(value) => {
                    let (ranks, skipped) = parse_restricted(&value);
                    log::info!(
                        "Loaded {} previous restricted ranks from {}",
                        ranks.len(),
                        path.display()
                    );
                    store.restricted = ranks;
                    store.report.skipped += skipped;
                    store.report.restricted_source = Some(path);
                }
                Err(e) => log::warn!(
                    "Unreadable ranks file {}: {}; restricted items will be marked NEW",
                    path.display(),
                    e
                ),
            },
            Ok(None) => log::warn!("No restricted ranks file; restricted items will be marked NEW"),
            Err(e) => log::warn!(
                "Ranks lookup failed: {}; restricted items will be marked NEW",
                e
            ),
        }

        if store.report.skipped > 0 {
            log::warn!("Skipped {} malformed snapshot entries", store.report.skipped);
        }

        store
    }

    /// Previous rank of `id`, keyed by id only.
    pub fn lookup(&self, namespace: Namespace, id: u64) -> Option<u32> {
        self.namespace(namespace).get(&id).copied()
    }

    pub fn len(&self, namespace: Namespace) -> usize {
        self.namespace(namespace).len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.restricted.is_empty()
    }

    /// Ids present in `namespace`.
    pub fn ids(&self, namespace: Namespace) -> impl Iterator<Item = u64> + '_ {
        self.namespace(namespace).keys().copied()
    }

    pub fn report(&self) -> &SnapshotLoadReport {
        &self.report
    }

    fn namespace(&self, namespace: Namespace) -> &HashMap<u64, u32> {
        match namespace {
            Namespace::Primary => &self.primary,
            Namespace::Restricted => &self.restricted,
        }
    }
}

/// Rank from the first whitespace-separated token of an annotation.
///
/// `"12 ↑3"` gives 12; `"NEW"`, `"12a"` and `""` give `None`.
pub fn parse_leading_rank(comment: &str) -> Option<u32> {
    let token = comment.split_whitespace().next()?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Parse a captured collection (`{subjects: [{id, comment}]}`).
///
/// Returns the ranks and the number of skipped entries.
pub fn parse_primary(value: &Value) -> (HashMap<u64, u32>, usize) {
    let mut ranks = HashMap::new();
    let mut skipped = 0;

    let Some(subjects) = value.get("subjects").and_then(Value::as_array) else {
        log::warn!("Snapshot has no subjects array");
        return (ranks, skipped);
    };

    for entry in subjects {
        let id = entry.get("id").and_then(Value::as_u64).filter(|id| *id > 0);
        let rank = entry
            .get("comment")
            .and_then(Value::as_str)
            .and_then(parse_leading_rank);

        match (id, rank) {
            (Some(id), Some(rank)) => {
                ranks.insert(id, rank);
            }
            _ => {
                log::debug!("Skipping snapshot entry {}", entry);
                skipped += 1;
            }
        }
    }

    (ranks, skipped)
}

/// Parse a restricted ranks file (`[{id, rank}]`).
pub fn parse_restricted(value: &Value) -> (HashMap<u64, u32>, usize) {
    let mut ranks = HashMap::new();
    let mut skipped = 0;

    let Some(entries) = value.as_array() else {
        log::warn!("Ranks file is not an array");
        return (ranks, skipped);
    };

    for entry in entries {
        match serde_json::from_value::<RankEntry>(entry.clone()) {
            Ok(RankEntry { id, rank }) if id > 0 && rank > 0 => {
                ranks.insert(id, rank);
            }
            _ => {
                log::debug!("Skipping ranks entry {}", entry);
                skipped += 1;
            }
        }
    }

    (ranks, skipped)
}

/// Extract `<rank> ... [url=<prefix><id>]` lines from a collection description.
///
/// The rank must open the line; numbers elsewhere on it are ignored.
pub fn extract_description_ranks(description: &str, url_prefix: &str) -> Result<Vec<RankEntry>> {
    let pattern = format!(r"^\s*(\d+)\s+[^\[]*\[url={}(\d+)\]", regex::escape(url_prefix));
    let re = Regex::new(&pattern).map_err(|e| AppError::config(e.to_string()))?;

    let mut entries = Vec::new();
    for line in description.lines() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let rank = caps[1].parse::<u32>();
        let id = caps[2].parse::<u64>();
        match (rank, id) {
            (Ok(rank), Ok(id)) => entries.push(RankEntry { id, rank }),
            _ => log::debug!("Skipping description line {:?}", line),
        }
    }

    Ok(entries)
}
