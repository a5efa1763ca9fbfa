//! Correspondence search between a query and one reference model.
//!
//! The stack runs in three stages: brute-force kNN proposal (`knn`), the
//! ratio test (`uniqueness`) and scale/rotation consensus voting (`vote`).
//! `score` ties them together into a single per-pair score.

pub mod knn;
pub mod score;
pub mod uniqueness;
pub mod vote;

pub use knn::knn_match;
pub use score::{Matcher, PairScore};
pub use uniqueness::vote_for_uniqueness;
pub use vote::{vote_for_size_and_orientation, VoteCell, VoteOutcome, VoteParams};

use crate::feature::Metric;
use crate::util::{IdMatchError, IdMatchResult};

/// Parameters of the matching stack.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Metric override. `None` uses the metric declared by the descriptors.
    pub metric: Option<Metric>,
    /// Number of nearest reference rows proposed per query row (>= 2).
    pub knn: usize,
    /// Ratio test threshold: alive iff `d0 < ratio * d1`.
    pub uniqueness_ratio: f32,
    /// Optional absolute ceiling on the nearest distance.
    pub max_distance: Option<f32>,
    /// Logarithmic step between scale bins (> 1).
    pub scale_increment: f32,
    /// Number of equal-width rotation bins over 360 degrees.
    pub rotation_bins: usize,
    /// Weight cast into each adjacent cell by a vote.
    pub neighbor_vote_weight: f32,
    /// An adjacent cell survives if its accumulated weight is at least this
    /// fraction of the winning cell's weight.
    pub neighbor_accept_ratio: f32,
    /// Minimum ratio-test survivors before voting runs.
    pub min_alive_for_voting: usize,
    /// Enable parallel execution (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            metric: None,
            knn: 10,
            uniqueness_ratio: 0.8,
            max_distance: None,
            scale_increment: 1.5,
            rotation_bins: 10,
            neighbor_vote_weight: 0.5,
            neighbor_accept_ratio: 0.5,
            min_alive_for_voting: 4,
            parallel: false,
        }
    }
}

impl MatchConfig {
    /// Checks ranges of all parameters.
    pub fn validate(&self) -> IdMatchResult<()> {
        if self.knn < 2 {
            return Err(IdMatchError::InvalidConfig {
                reason: "knn must be >= 2",
            });
        }
        if !self.uniqueness_ratio.is_finite() || self.uniqueness_ratio <= 0.0 {
            return Err(IdMatchError::InvalidConfig {
                reason: "uniqueness_ratio must be finite and > 0",
            });
        }
        if let Some(ceiling) = self.max_distance {
            if !ceiling.is_finite() || ceiling < 0.0 {
                return Err(IdMatchError::InvalidConfig {
                    reason: "max_distance must be finite and >= 0",
                });
            }
        }
        self.vote_params().validate()
    }

    /// Voting parameters carried by this config.
    pub fn vote_params(&self) -> VoteParams {
        VoteParams {
            scale_increment: self.scale_increment,
            rotation_bins: self.rotation_bins,
            neighbor_vote_weight: self.neighbor_vote_weight,
            neighbor_accept_ratio: self.neighbor_accept_ratio,
        }
    }
}

/// Nearest-neighbor table and alive mask for one query against one reference.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    k: usize,
    indices: Vec<usize>,
    distances: Vec<f32>,
    alive: Vec<bool>,
}

impl MatchResult {
    /// Result with `rows` query rows and no neighbors; every row is dead.
    pub(crate) fn empty(rows: usize) -> Self {
        Self {
            k: 0,
            indices: Vec::new(),
            distances: Vec::new(),
            alive: vec![false; rows],
        }
    }

    /// Builds a result from flat `rows * k` tables; every row starts alive.
    pub(crate) fn from_table(k: usize, indices: Vec<usize>, distances: Vec<f32>) -> Self {
        debug_assert_eq!(indices.len(), distances.len());
        let rows = if k == 0 { 0 } else { indices.len() / k };
        Self {
            k,
            indices,
            distances,
            alive: vec![true; rows],
        }
    }

    /// Number of query rows.
    pub fn rows(&self) -> usize {
        self.alive.len()
    }

    /// Neighbors per row after clamping to the reference size.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns true if no neighbors were proposed.
    pub fn is_empty(&self) -> bool {
        self.k == 0
    }

    /// Reference indices of row `row`, nearest first.
    pub fn neighbors(&self, row: usize) -> &[usize] {
        self.indices
            .get(row * self.k..(row + 1) * self.k)
            .unwrap_or(&[])
    }

    /// Distances of row `row`, ascending.
    pub fn distances(&self, row: usize) -> &[f32] {
        self.distances
            .get(row * self.k..(row + 1) * self.k)
            .unwrap_or(&[])
    }

    /// Nearest reference index and distance of row `row`.
    pub fn best(&self, row: usize) -> Option<(usize, f32)> {
        let idx = *self.neighbors(row).first()?;
        let dist = *self.distances(row).first()?;
        Some((idx, dist))
    }

    /// Alive mask aligned to query rows.
    pub fn alive(&self) -> &[bool] {
        &self.alive
    }

    /// Indices of alive rows.
    pub fn alive_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter_map(|(row, &alive)| alive.then_some(row))
    }

    /// Number of alive rows.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&alive| alive).count()
    }

    pub(crate) fn kill(&mut self, row: usize) {
        if let Some(slot) = self.alive.get_mut(row) {
            *slot = false;
        }
    }
}
