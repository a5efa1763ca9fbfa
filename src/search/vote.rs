//! Scale/rotation consensus voting over alive correspondences.
//!
//! Every alive correspondence implies a relative scale (`query.size /
//! reference.size`) and rotation (`query.angle - reference.angle`). These are
//! quantized into a 2D histogram with logarithmic scale bins and circular
//! rotation bins. Each vote adds 1 to its own cell and a fractional weight to
//! the four adjacent cells so that transforms straddling a bin edge still
//! reinforce each other. The heaviest cell wins; correspondences outside the
//! winning cell are killed unless their cell is adjacent to the winner and
//! carries at least `neighbor_accept_ratio` of the winner's weight.

use crate::feature::Keypoint;
use crate::search::MatchResult;
use crate::trace::trace_event;
use crate::util::math::{angle_bin, circular_bin_distance, log_bin, wrap_deg_positive};
use crate::util::{IdMatchError, IdMatchResult};
use std::collections::BTreeMap;

/// Histogram parameters for consensus voting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoteParams {
    /// Ratio between consecutive scale bins (> 1).
    pub scale_increment: f32,
    /// Number of rotation bins over 360 degrees (>= 1).
    pub rotation_bins: usize,
    /// Weight added to each adjacent cell, in [0, 1].
    pub neighbor_vote_weight: f32,
    /// Minimum fraction of the winner's weight an adjacent cell needs.
    pub neighbor_accept_ratio: f32,
}

impl Default for VoteParams {
    fn default() -> Self {
        Self {
            scale_increment: 1.5,
            rotation_bins: 10,
            neighbor_vote_weight: 0.5,
            neighbor_accept_ratio: 0.5,
        }
    }
}

impl VoteParams {
    pub(crate) fn validate(&self) -> IdMatchResult<()> {
        if !self.scale_increment.is_finite() || self.scale_increment <= 1.0 {
            return Err(IdMatchError::InvalidConfig {
                reason: "scale_increment must be finite and > 1",
            });
        }
        if self.rotation_bins == 0 {
            return Err(IdMatchError::InvalidConfig {
                reason: "rotation_bins must be >= 1",
            });
        }
        if !(0.0..=1.0).contains(&self.neighbor_vote_weight) {
            return Err(IdMatchError::InvalidConfig {
                reason: "neighbor_vote_weight must be in [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.neighbor_accept_ratio) {
            return Err(IdMatchError::InvalidConfig {
                reason: "neighbor_accept_ratio must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Histogram cell: logarithmic scale bin and rotation bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoteCell {
    /// `round(ln(scale_ratio) / ln(scale_increment))`; 0 means equal size.
    pub scale_bin: i32,
    /// Rotation bin in `0..rotation_bins`; 0 contains zero rotation.
    pub rotation_bin: usize,
}

impl VoteCell {
    fn of(query: &Keypoint, reference: &Keypoint, params: &VoteParams) -> Self {
        let scale_ratio = query.size / reference.size;
        let delta = wrap_deg_positive(query.angle - reference.angle);
        Self {
            scale_bin: log_bin(scale_ratio, params.scale_increment),
            rotation_bin: angle_bin(delta, params.rotation_bins),
        }
    }

    fn is_adjacent(&self, other: &VoteCell, rotation_bins: usize) -> bool {
        let ds = self.scale_bin.abs_diff(other.scale_bin);
        let dr = circular_bin_distance(self.rotation_bin, other.rotation_bin, rotation_bins);
        ds <= 1 && dr <= 1
    }

    fn neighbors(&self, rotation_bins: usize) -> Vec<VoteCell> {
        let mut out = vec![
            VoteCell {
                scale_bin: self.scale_bin.saturating_sub(1),
                rotation_bin: self.rotation_bin,
            },
            VoteCell {
                scale_bin: self.scale_bin.saturating_add(1),
                rotation_bin: self.rotation_bin,
            },
        ];
        if rotation_bins > 1 {
            out.push(VoteCell {
                scale_bin: self.scale_bin,
                rotation_bin: (self.rotation_bin + 1) % rotation_bins,
            });
            out.push(VoteCell {
                scale_bin: self.scale_bin,
                rotation_bin: (self.rotation_bin + rotation_bins - 1) % rotation_bins,
            });
        }
        out.sort();
        out.dedup();
        out.retain(|cell| cell != self);
        out
    }
}

/// Result of a voting pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoteOutcome {
    /// Correspondences alive after voting.
    pub survivors: usize,
    /// Winning cell, `None` when nothing entered the vote.
    pub winner: Option<VoteCell>,
    /// Accumulated weight of the winning cell.
    pub winner_weight: f32,
}

/// Runs consensus voting on the alive rows of `result` and kills the rows
/// that disagree with the winning transform.
///
/// `query_keypoints` is aligned to the result rows, `reference_keypoints` to
/// the neighbor indices. Alive rows are only ever killed, never revived.
pub fn vote_for_size_and_orientation(
    query_keypoints: &[Keypoint],
    reference_keypoints: &[Keypoint],
    result: &mut MatchResult,
    params: &VoteParams,
) -> IdMatchResult<VoteOutcome> {
    params.validate()?;

    let mut cells: Vec<(usize, VoteCell)> = Vec::new();
    for row in result.alive_rows() {
        let (best, _) = result.best(row).ok_or(IdMatchError::RaggedModel {
            keypoints: reference_keypoints.len(),
            descriptors: result.k(),
            cross_hits: None,
        })?;
        let (Some(query), Some(reference)) =
            (query_keypoints.get(row), reference_keypoints.get(best))
        else {
            return Err(IdMatchError::RaggedModel {
                keypoints: query_keypoints.len(),
                descriptors: result.rows(),
                cross_hits: None,
            });
        };
        cells.push((row, VoteCell::of(query, reference, params)));
    }

    if cells.is_empty() {
        return Ok(VoteOutcome {
            survivors: 0,
            winner: None,
            winner_weight: 0.0,
        });
    }

    let mut weights: BTreeMap<VoteCell, f32> = BTreeMap::new();
    for (_, cell) in &cells {
        *weights.entry(*cell).or_insert(0.0) += 1.0;
        if params.neighbor_vote_weight > 0.0 {
            for neighbor in cell.neighbors(params.rotation_bins) {
                *weights.entry(neighbor).or_insert(0.0) += params.neighbor_vote_weight;
            }
        }
    }

    // Strict comparison keeps the lowest (scale, rotation) cell on ties.
    let mut winner = cells[0].1;
    let mut winner_weight = f32::NEG_INFINITY;
    for (cell, &weight) in &weights {
        if weight > winner_weight {
            winner = *cell;
            winner_weight = weight;
        }
    }

    let accept_floor = params.neighbor_accept_ratio * winner_weight;
    let mut survivors = 0usize;
    for (row, cell) in &cells {
        let accepted = *cell == winner
            || (cell.is_adjacent(&winner, params.rotation_bins)
                && weights.get(cell).copied().unwrap_or(0.0) >= accept_floor);
        if accepted {
            survivors += 1;
        } else {
            result.kill(*row);
        }
    }

    trace_event!(
        "vote",
        entered = cells.len(),
        survivors = survivors,
        scale_bin = winner.scale_bin,
        rotation_bin = winner.rotation_bin
    );

    Ok(VoteOutcome {
        survivors,
        winner: Some(winner),
        winner_weight,
    })
}
