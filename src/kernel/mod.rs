//! Descriptor distance kernels and brute-force kNN scans.

use crate::candidate::topk::{Neighbor, TopK};

/// Distance kernel over one descriptor element type.
pub trait Kernel {
    type Elem: Copy + Send + Sync;

    /// Distance between two rows of equal width.
    fn distance(a: &[Self::Elem], b: &[Self::Elem]) -> f32;

    /// Returns the `k` nearest reference rows of a single query row, nearest
    /// first. `k` must not exceed the number of reference rows.
    fn knn_row(
        row: &[Self::Elem],
        reference: &[Self::Elem],
        width: usize,
        k: usize,
    ) -> Vec<Neighbor> {
        let mut topk = TopK::new(k);
        for (index, candidate) in reference.chunks_exact(width).enumerate() {
            topk.push(Neighbor {
                index,
                distance: Self::distance(row, candidate),
            });
        }
        topk.into_sorted_asc()
    }

    /// Scans every query row and returns a flat `rows * k` neighbor table.
    fn scan_knn(
        query: &[Self::Elem],
        reference: &[Self::Elem],
        width: usize,
        k: usize,
    ) -> Vec<Neighbor> {
        let rows = query.len() / width;
        let mut out = Vec::with_capacity(rows * k);
        for row in query.chunks_exact(width) {
            out.extend(Self::knn_row(row, reference, width, k));
        }
        out
    }
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;
