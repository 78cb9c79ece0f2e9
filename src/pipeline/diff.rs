// src/pipeline/diff.rs

//! Rank delta calculation.
//!
//! Compares an item's current rank position with the one it held in the
//! previous period's snapshot and renders the annotation token published
//! alongside it. Works on typed ranks only; text parsing stays in the
//! snapshot loader.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Movement class of an item between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RankState {
    /// Not present last period
    New,
    /// Rank number decreased
    Up,
    /// Rank number increased
    Down,
    Same,
}

/// Current rank plus its change against the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankAnnotation {
    pub current_rank: u32,
    /// `previous - current`; positive means the item climbed
    pub delta: Option<i64>,
    pub state: RankState,
}

impl RankAnnotation {
    /// Canonical token, e.g. `5 NEW`, `5 ↑3`, `8 ↓3`, `5 -`.
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RankAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = self.current_rank;
        match (self.state, self.delta) {
            (RankState::New, _) | (_, None) => write!(f, "{rank} NEW"),
            (RankState::Up, Some(d)) => write!(f, "{rank} ↑{}", d.unsigned_abs()),
            (RankState::Down, Some(d)) => write!(f, "{rank} ↓{}", d.unsigned_abs()),
            (RankState::Same, Some(_)) => write!(f, "{rank} -"),
        }
    }
}

/// Annotate `current_rank` against an optional previous rank.
pub fn annotate(current_rank: u32, previous_rank: Option<u32>) -> RankAnnotation {
    let Some(previous) = previous_rank else {
        return RankAnnotation {
            current_rank,
            delta: None,
            state: RankState::New,
        };
    };

    // Widened so any pair of u32 ranks subtracts without overflow
    let delta = i64::from(previous) - i64::from(current_rank);
    let state = match delta {
        d if d > 0 => RankState::Up,
        d if d < 0 => RankState::Down,
        _ => RankState::Same,
    };

    RankAnnotation {
        current_rank,
        delta: Some(delta),
        state,
    }
}

/// Counts per movement class for one output group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub new: usize,
    pub risen: usize,
    pub fallen: usize,
    pub unchanged: usize,
    /// In the snapshot but absent from this period
    pub dropped: usize,
}

impl DiffSummary {
    pub fn record(&mut self, annotation: &RankAnnotation) {
        match annotation.state {
            RankState::New => self.new += 1,
            RankState::Up => self.risen += 1,
            RankState::Down => self.fallen += 1,
            RankState::Same => self.unchanged += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.new + self.risen + self.fallen + self.unchanged
    }
}
