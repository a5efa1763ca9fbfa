//! SIMD-accelerated Euclidean kernel using the `wide` crate.
//!
//! Float descriptors (64/128 wide for SURF/SIFT) are processed 8 lanes at a
//! time with a scalar tail.

use crate::kernel::Kernel;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// SIMD Euclidean distance over float rows.
pub struct EuclideanF32Simd;

impl Kernel for EuclideanF32Simd {
    type Elem = f32;

    #[inline]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let simd_end = a.len() / LANES * LANES;
        let mut acc = f32x8::ZERO;
        let mut i = 0;
        while i < simd_end {
            let d = load_f32x8(&a[i..i + LANES]) - load_f32x8(&b[i..i + LANES]);
            acc = acc + d * d;
            i += LANES;
        }
        let mut sum: f32 = acc.to_array().iter().sum();
        for (x, y) in a[simd_end..].iter().zip(&b[simd_end..]) {
            let d = x - y;
            sum += d * d;
        }
        sum.sqrt()
    }
}
