//! Brute-force kNN proposal between a query and a reference descriptor set.

use crate::candidate::topk::Neighbor;
use crate::feature::{DescriptorKind, DescriptorSet, Metric};
#[cfg(feature = "rayon")]
use crate::kernel::rayon::scan_knn_par;
use crate::kernel::scalar::{EuclideanU8Scalar, HammingScalar};
use crate::kernel::Kernel;
use crate::search::{MatchConfig, MatchResult};
use crate::util::{IdMatchError, IdMatchResult};

// Float kernel alias - use SIMD when available
#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::EuclideanF32Scalar as EuclideanF32;
#[cfg(feature = "simd")]
use crate::kernel::simd::EuclideanF32Simd as EuclideanF32;

/// Resolves the metric used to compare `query` against `reference`.
///
/// With an override only family and width have to agree; otherwise the two
/// sets must also have been declared for the same metric.
pub(crate) fn resolve_metric(
    query: &DescriptorSet,
    reference: &DescriptorSet,
    cfg: &MatchConfig,
) -> IdMatchResult<Metric> {
    let (q, r) = (query.spec(), reference.spec());
    match cfg.metric {
        Some(metric) => {
            if q.kind != r.kind || q.width != r.width {
                return Err(IdMatchError::DescriptorMismatch {
                    expected_kind: r.kind,
                    expected_width: r.width,
                    got_kind: q.kind,
                    got_width: q.width,
                });
            }
            if !metric.supports(r.kind) {
                return Err(IdMatchError::IncompatibleMetric {
                    metric,
                    kind: r.kind,
                });
            }
            Ok(metric)
        }
        None => {
            r.ensure_compatible(&q)?;
            Ok(r.metric)
        }
    }
}

fn scan<K: Kernel>(
    query: &[K::Elem],
    reference: &[K::Elem],
    width: usize,
    k: usize,
    parallel: bool,
) -> Vec<Neighbor> {
    #[cfg(feature = "rayon")]
    if parallel {
        return scan_knn_par::<K>(query, reference, width, k);
    }
    let _ = parallel;
    K::scan_knn(query, reference, width, k)
}

fn binary_rows(set: &DescriptorSet, metric: Metric) -> IdMatchResult<&[u8]> {
    set.as_binary().ok_or(IdMatchError::IncompatibleMetric {
        metric,
        kind: set.kind(),
    })
}

fn float_rows(set: &DescriptorSet, metric: Metric) -> IdMatchResult<&[f32]> {
    set.as_float().ok_or(IdMatchError::IncompatibleMetric {
        metric,
        kind: set.kind(),
    })
}

/// For every query row returns the `cfg.knn` nearest reference rows.
///
/// `k` is clamped to the reference size. An empty query or reference yields
/// an empty result in which every row is dead, provided the two sets are
/// still comparable.
pub fn knn_match(
    query: &DescriptorSet,
    reference: &DescriptorSet,
    cfg: &MatchConfig,
) -> IdMatchResult<MatchResult> {
    let metric = resolve_metric(query, reference, cfg)?;
    if query.is_empty() || reference.is_empty() {
        return Ok(MatchResult::empty(query.len()));
    }
    let k = cfg.knn.min(reference.len());
    let width = reference.width();

    let table = match (metric, reference.kind()) {
        (Metric::Hamming, _) => scan::<HammingScalar>(
            binary_rows(query, metric)?,
            binary_rows(reference, metric)?,
            width,
            k,
            cfg.parallel,
        ),
        (Metric::Euclidean, DescriptorKind::Binary) => scan::<EuclideanU8Scalar>(
            binary_rows(query, metric)?,
            binary_rows(reference, metric)?,
            width,
            k,
            cfg.parallel,
        ),
        (Metric::Euclidean, DescriptorKind::Float) => scan::<EuclideanF32>(
            float_rows(query, metric)?,
            float_rows(reference, metric)?,
            width,
            k,
            cfg.parallel,
        ),
    };

    let (indices, distances): (Vec<usize>, Vec<f32>) =
        table.into_iter().map(|n| (n.index, n.distance)).unzip();
    Ok(MatchResult::from_table(k, indices, distances))
}
