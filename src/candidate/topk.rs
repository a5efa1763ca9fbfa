//! Top-K tracking of the nearest reference rows for one query row.

use std::cmp::Ordering;

/// Candidate reference row for a query descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Row index in the reference descriptor set.
    pub index: usize,
    /// Distance under the active metric.
    pub distance: f32,
}

fn neighbor_cmp_asc(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// Sorts neighbors by ascending distance with deterministic tie-breaking.
pub(crate) fn sort_neighbors_asc(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(neighbor_cmp_asc);
}

/// Top-K container keeping the K closest neighbors, O(k) per insertion.
pub struct TopK<T> {
    k: usize,
    items: Vec<T>,
}

impl TopK<Neighbor> {
    /// Creates a new Top-K collector.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    /// Pushes a neighbor, evicting the farthest one if at capacity.
    pub fn push(&mut self, neighbor: Neighbor) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(neighbor);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if neighbor_cmp_asc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if neighbor_cmp_asc(&neighbor, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = neighbor;
        }
    }

    /// Returns neighbors sorted nearest first.
    pub fn into_sorted_asc(mut self) -> Vec<Neighbor> {
        sort_neighbors_asc(&mut self.items);
        self.items
    }
}
