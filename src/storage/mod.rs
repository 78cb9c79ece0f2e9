// src/storage/mod.rs

//! Storage abstractions for rankings and snapshots.
//!
//! ## Directory Structure
//!
//! ```text
//! output/
//! ├── json/
//! │   └── ranking_2026.json            # Ranked output of a fetch run
//! ├── indices/
//! │   └── index_74044_20260101_*.json  # Captured collections (primary snapshot)
//! └── ranks/
//!     └── ranks_20260101_*.json        # Restricted-namespace snapshot
//! ```
//!
//! Snapshot files carry no version number; the newest by modification time
//! wins.

pub mod local;
pub mod snapshot;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{CaptureDocument, OutputDocument, RankEntry};

// Re-export for convenience
pub use local::LocalStorage;
pub use snapshot::{Namespace, SnapshotLoadReport, SnapshotStore};

/// Trait for ranking storage backends.
#[async_trait]
pub trait RankStorage: Send + Sync {
    /// Persist a ranked output document, returning where it went.
    async fn save_output(&self, document: &OutputDocument) -> Result<PathBuf>;

    /// Load an output document; `None` means this year's default location.
    async fn load_output(&self, path: Option<&Path>) -> Result<OutputDocument>;

    /// Persist a captured collection.
    async fn save_capture(&self, document: &CaptureDocument) -> Result<PathBuf>;

    /// Persist restricted-namespace rank entries.
    async fn save_ranks(&self, entries: &[RankEntry]) -> Result<PathBuf>;

    /// Newest captured snapshot of `collection_id`, if any.
    async fn latest_capture(&self, collection_id: u64) -> Result<Option<PathBuf>>;

    /// Newest restricted-namespace snapshot, if any.
    async fn latest_ranks(&self) -> Result<Option<PathBuf>>;

    /// Read a stored document as untyped JSON.
    async fn read_value(&self, path: &Path) -> Result<Value>;
}
