//! Ratio test rejecting ambiguous correspondences.

use crate::search::MatchResult;

/// Kills every alive row whose nearest neighbor is not clearly closer than
/// the second nearest, and returns the number of rows still alive.
///
/// A row survives iff `d0 < ratio * d1` and, when `max_distance` is set,
/// `d0 <= max_distance`. Rows with fewer than two neighbors cannot show
/// uniqueness and are killed. Raising `ratio` never reduces the survivors.
pub fn vote_for_uniqueness(
    result: &mut MatchResult,
    ratio: f32,
    max_distance: Option<f32>,
) -> usize {
    for row in 0..result.rows() {
        if !result.alive()[row] {
            continue;
        }
        let keep = match result.distances(row) {
            [d0, d1, ..] => {
                *d0 < ratio * *d1 && !max_distance.is_some_and(|ceiling| *d0 > ceiling)
            }
            _ => false,
        };
        if !keep {
            result.kill(row);
        }
    }
    result.alive_count()
}
