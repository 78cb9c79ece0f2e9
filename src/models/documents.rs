// src/models/documents.rs

//! Wire payloads and on-disk documents.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::{Item, RawSubject};

/// One page of the subject search endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    /// `None` when the server has nothing more to say
    #[serde(default)]
    pub data: Option<Vec<RawSubject>>,

    #[serde(default)]
    pub total: usize,
}

/// Collection (index) metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub desc: String,

    /// Everything else the API returns, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One subject listed inside a collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionSubject {
    #[serde(default)]
    pub id: u64,

    #[serde(default)]
    pub comment: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of a collection's subject listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionPage {
    #[serde(default)]
    pub data: Option<Vec<CollectionSubject>>,

    #[serde(default)]
    pub total: usize,
}

/// Body of a per-subject upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub sort: u32,
    pub comment: String,
}

/// Snapshot of a collection as captured from the remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDocument {
    pub index_info: CollectionInfo,
    pub subjects: Vec<CollectionSubject>,
    pub metadata: CaptureMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub fetch_date: DateTime<Utc>,
    pub total_subjects: usize,
    pub subject_type: u32,
}

/// Restricted-namespace snapshot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub id: u64,
    pub rank: u32,
}

/// Ranked output of a fetch run, input of a publish run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub metadata: OutputMetadata,
    pub normal: Vec<Item>,
    pub restricted: Vec<Item>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub fetch_date: DateTime<Utc>,
    pub year: i32,
    pub total: usize,
    pub normal_count: usize,
    pub restricted_count: usize,
    /// SHA-256 over the ordered (id, rank_position) pairs
    pub digest: String,
}

impl OutputDocument {
    /// Load an output document from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_without_data() {
        let page: SearchPage = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert!(page.data.is_none());
    }

    #[test]
    fn test_collection_info_keeps_unknown_fields() {
        let info: CollectionInfo =
            serde_json::from_str(r#"{"id": 7, "title": "t", "desc": "d", "stat": {"collects": 3}}"#)
                .unwrap();
        assert_eq!(info.id, 7);
        assert!(info.extra.contains_key("stat"));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["stat"]["collects"], 3);
    }
}
