//! Full per-pair scoring: kNN, ratio test, then consensus voting.

use crate::gallery::Model;
use crate::search::{
    knn_match, vote_for_size_and_orientation, vote_for_uniqueness, MatchConfig, MatchResult,
    VoteOutcome,
};
use crate::trace::{trace_event, trace_span};
use crate::util::IdMatchResult;

/// Score of one query model against one reference model.
#[derive(Clone, Debug, PartialEq)]
pub struct PairScore {
    /// Number of correspondences that survived every stage.
    pub score: usize,
    /// Survivors of the ratio test, before voting.
    pub unique: usize,
    /// Voting outcome, `None` when too few rows were unique to vote.
    pub vote: Option<VoteOutcome>,
    /// Final neighbor table and alive mask, aligned to the query rows.
    pub result: MatchResult,
}

impl PairScore {
    /// Returns true if the consensus vote ran for this pair.
    pub fn voted(&self) -> bool {
        self.vote.is_some()
    }
}

/// Scores query models against reference models with a fixed configuration.
#[derive(Clone, Debug)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_validated(MatchConfig::default())
    }
}

impl Matcher {
    /// Creates a matcher after validating the configuration.
    pub fn new(cfg: MatchConfig) -> IdMatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub(crate) fn from_validated(cfg: MatchConfig) -> Self {
        Self { cfg }
    }

    /// Returns the matcher configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Runs the matching stack for `query` against `reference`.
    ///
    /// When fewer than `min_alive_for_voting` rows pass the ratio test the
    /// vote is skipped and the score is the ratio-test survivor count. The
    /// score is never larger than the number of query keypoints.
    pub fn score(&self, query: &Model, reference: &Model) -> IdMatchResult<PairScore> {
        let _span = trace_span!(
            "score_pair",
            query = query.len(),
            reference = reference.len()
        )
        .entered();

        let mut result = knn_match(query.descriptors(), reference.descriptors(), &self.cfg)?;
        let unique =
            vote_for_uniqueness(&mut result, self.cfg.uniqueness_ratio, self.cfg.max_distance);

        let vote = if unique >= self.cfg.min_alive_for_voting {
            Some(vote_for_size_and_orientation(
                query.keypoints(),
                reference.keypoints(),
                &mut result,
                &self.cfg.vote_params(),
            )?)
        } else {
            None
        };
        let score = vote.map_or(unique, |outcome| outcome.survivors);

        trace_event!("pair_scored", unique = unique, score = score);
        Ok(PairScore {
            score,
            unique,
            vote,
            result,
        })
    }
}
