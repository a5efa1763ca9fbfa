//! Scalar reference distance kernels.

use crate::kernel::Kernel;

/// Hamming distance over packed bit codes.
pub struct HammingScalar;

/// Euclidean distance over byte-valued rows.
pub struct EuclideanU8Scalar;

/// Euclidean distance over float rows.
pub struct EuclideanF32Scalar;

impl Kernel for HammingScalar {
    type Elem = u8;

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x ^ y).count_ones())
            .sum::<u32>() as f32
    }
}

impl Kernel for EuclideanU8Scalar {
    type Elem = u8;

    #[inline]
    fn distance(a: &[u8], b: &[u8]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let sum: u64 = a
            .iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let d = x.abs_diff(y) as u64;
                d * d
            })
            .sum();
        (sum as f64).sqrt() as f32
    }
}

impl Kernel for EuclideanF32Scalar {
    type Elem = f32;

    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let sum: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum();
        sum.sqrt()
    }
}
