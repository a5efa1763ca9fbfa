//! Candidate correspondence selection.
//!
//! Holds the Top-K collector used by the brute-force kNN scan.

pub(crate) mod topk;
