// src/services/mod.rs

//! Service layer for the rank synchronization pipeline.
//!
//! This module contains the remote-facing logic:
//! - Catalog API seam and its HTTP implementation (`CatalogApi`, `HttpCatalogClient`)
//! - Paginated ranking retrieval (`RankingFetcher`)
//! - Per-item upsert publication (`Publisher`)

mod client;
mod fetcher;
mod publisher;

#[cfg(test)]
pub(crate) mod stub;

pub use client::{CatalogApi, HttpCatalogClient, search_body};
pub use fetcher::RankingFetcher;
pub use publisher::{PublishEntry, PublishFailure, PublishSummary, Publisher};
