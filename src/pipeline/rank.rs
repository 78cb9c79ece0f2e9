// src/pipeline/rank.rs

//! Ranking and partitioning.
//!
//! Two passes with different keys:
//!
//! 1. processing order: ascending score, ties broken by descending catalog
//!    rank (the less confident entry sinks);
//! 2. publish order: descending catalog rank, worst first.
//!
//! Between the passes the list is regrouped, unrestricted items first, each
//! group keeping its processing order. The second sort is stable, so among
//! items sharing a catalog rank every unrestricted item precedes every
//! restricted one, and within a group processing order holds. Catalog rank
//! and score can disagree; both passes are kept as-is on purpose.

use std::cmp::Ordering;

use sha2::{Digest, Sha256};

use crate::models::Item;

/// Result of ranking one run's items.
#[derive(Debug, Clone, Default)]
pub struct RankedSet {
    /// Truncated union in publish order, `rank_position` 1..=N
    pub ranked: Vec<Item>,
    /// Unrestricted items, in rank order
    pub normal: Vec<Item>,
    /// Restricted items, in rank order
    pub restricted: Vec<Item>,
}

impl RankedSet {
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// SHA-256 hex over the ordered `(id, rank_position)` pairs.
    pub fn digest(&self) -> String {
        ranking_digest(&self.ranked)
    }
}

/// Processing-order comparator.
fn by_score(a: &Item, b: &Item) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| b.source_rank.cmp(&a.source_rank))
}

/// Sort by ascending score, tie-break by descending catalog rank.
pub fn sort_by_score(items: &mut [Item]) {
    items.sort_by(by_score);
}

/// Sort, truncate to `top_n`, assign dense positions and split by the
/// restricted flag.
pub fn rank_and_split(mut items: Vec<Item>, top_n: usize) -> RankedSet {
    sort_by_score(&mut items);
    items.sort_by_key(|item| item.restricted);
    items.sort_by(|a, b| b.source_rank.cmp(&a.source_rank));
    items.truncate(top_n);

    for (idx, item) in items.iter_mut().enumerate() {
        item.rank_position = Some(idx as u32 + 1);
    }

    let (restricted, normal): (Vec<Item>, Vec<Item>) =
        items.iter().cloned().partition(|item| item.restricted);

    log::info!(
        "Ranked {} items: {} normal, {} restricted",
        items.len(),
        normal.len(),
        restricted.len()
    );

    RankedSet {
        ranked: items,
        normal,
        restricted,
    }
}

/// Digest of a ranking, stable across runs with identical input.
pub fn ranking_digest(items: &[Item]) -> String {
    let mut hasher = Sha256::new();
    for item in items {
        let position = item.rank_position.unwrap_or(0);
        hasher.update(format!("{}:{}\n", item.id, position).as_bytes());
    }
    hex::encode(hasher.finalize())
}
