//! Rayon-parallel kNN scan (feature-gated).
//!
//! Query rows are independent, so the scan is split across rows; the output
//! table is identical to the sequential `Kernel::scan_knn`.

use crate::candidate::topk::Neighbor;
use crate::kernel::Kernel;
use rayon::prelude::*;

/// Row-parallel brute-force kNN scan.
pub fn scan_knn_par<K: Kernel>(
    query: &[K::Elem],
    reference: &[K::Elem],
    width: usize,
    k: usize,
) -> Vec<Neighbor> {
    let row_results: Vec<Vec<Neighbor>> = query
        .par_chunks_exact(width)
        .map(|row| K::knn_row(row, reference, width, k))
        .collect();

    let mut out = Vec::with_capacity(row_results.len() * k);
    for neighbors in row_results {
        out.extend(neighbors);
    }
    out
}
