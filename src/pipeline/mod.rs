// src/pipeline/mod.rs

//! Pipeline entry points for rank synchronization.
//!
//! - `run_fetch`: Fetch and rank the catalog, write the output document
//! - `run_publish`: Diff an output document against the previous period and publish it
//! - `run_sync`: Fetch then publish
//! - `run_capture`: Snapshot the previous period's collection
//! - `run_validate`: Check configuration

pub mod capture;
pub mod diff;
pub mod rank;
pub mod sync;
pub mod validate;

pub use capture::{CaptureSummary, run_capture};
pub use diff::{DiffSummary, RankAnnotation, RankState, annotate};
pub use rank::{RankedSet, rank_and_split};
pub use sync::{
    FetchReport, PublishReport, build_output, plan_entries, render_description, run_fetch,
    run_publish, run_sync,
};
pub use validate::run_validate;
