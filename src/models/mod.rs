// src/models/mod.rs

//! Domain models for the rank synchronization pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod documents;
mod item;

// Re-export all public types
pub use config::{
    ApiConfig, CollectionsConfig, Config, Credentials, PathsConfig, QueryConfig, RankingConfig,
    RetryConfig,
};
pub use documents::{
    CaptureDocument, CaptureMetadata, CollectionEntry, CollectionInfo, CollectionPage,
    CollectionSubject, OutputDocument, OutputMetadata, RankEntry, SearchPage,
};
pub use item::{Item, Rating, RawSubject};
