//! Built-in distance metrics.

use crate::Distance;
use kombu_core::{Maximize, Minimize, VectorElement};

/// Sum of squared differences, accumulated 4-wide.
#[inline]
fn squared_l2_sum<Q: VectorElement, T: VectorElement>(a: &[Q], b: &[T]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base].to_f32() - b[base].to_f32();
        let d1 = a[base + 1].to_f32() - b[base + 1].to_f32();
        let d2 = a[base + 2].to_f32() - b[base + 2].to_f32();
        let d3 = a[base + 3].to_f32() - b[base + 3].to_f32();
        sum += d0 * d0 + d1 * d1 + d2 * d2 + d3 * d3;
    }

    for i in (chunks * 4)..a.len() {
        let d = a[i].to_f32() - b[i].to_f32();
        sum += d * d;
    }

    sum
}

/// Dot product, accumulated 4-wide.
#[inline]
fn dot<Q: VectorElement, T: VectorElement>(a: &[Q], b: &[T]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let mut sum = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        sum += a[base].to_f32() * b[base].to_f32()
            + a[base + 1].to_f32() * b[base + 1].to_f32()
            + a[base + 2].to_f32() * b[base + 2].to_f32()
            + a[base + 3].to_f32() * b[base + 3].to_f32();
    }

    for i in (chunks * 4)..a.len() {
        sum += a[i].to_f32() * b[i].to_f32();
    }

    sum
}

/// Dot product and squared norm of `b` in a single pass.
#[inline]
fn dot_and_norm<Q: VectorElement, T: VectorElement>(a: &[Q], b: &[T]) -> (f32, f32) {
    debug_assert_eq!(a.len(), b.len(), "vector dimensions must match");

    let mut dot = 0.0f32;
    let mut norm_b = 0.0f32;
    let chunks = a.len() / 4;

    for i in 0..chunks {
        let base = i * 4;
        let (b0, b1, b2, b3) = (
            b[base].to_f32(),
            b[base + 1].to_f32(),
            b[base + 2].to_f32(),
            b[base + 3].to_f32(),
        );
        dot += a[base].to_f32() * b0
            + a[base + 1].to_f32() * b1
            + a[base + 2].to_f32() * b2
            + a[base + 3].to_f32() * b3;
        norm_b += b0 * b0 + b1 * b1 + b2 * b2 + b3 * b3;
    }

    for i in (chunks * 4)..a.len() {
        let bi = b[i].to_f32();
        dot += a[i].to_f32() * bi;
        norm_b += bi * bi;
    }

    (dot, norm_b)
}

/// Squared Euclidean (L2) distance. Lower is better.
///
/// The square root is omitted: it is monotone, so the neighbor ordering is
/// unchanged and comparisons stay cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredL2;

impl<Q: VectorElement, T: VectorElement> Distance<Q, T> for SquaredL2 {
    type Order = Minimize;

    #[inline]
    fn compute(&self, query: &[Q], datum: &[T]) -> f32 {
        squared_l2_sum(query, datum)
    }
}

/// Inner product similarity. Higher is better.
///
/// The raw dot product is reported; the polarity lives in `Order`, so no
/// sign flip is smuggled into the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerProduct;

impl<Q: VectorElement, T: VectorElement> Distance<Q, T> for InnerProduct {
    type Order = Maximize;

    #[inline]
    fn compute(&self, query: &[Q], datum: &[T]) -> f32 {
        dot(query, datum)
    }
}

/// Cosine distance `1 - cos(query, datum)`. Lower is better.
///
/// Values range over `[0, 2]`: 0 for identical direction, 1 for
/// orthogonal, 2 for opposite. `fix_argument` caches the query norm so the
/// per-datum kernel runs a single fused pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine {
    query_norm: f32,
}

impl<Q: VectorElement, T: VectorElement> Distance<Q, T> for Cosine {
    type Order = Minimize;

    fn fix_argument(&mut self, query: &[Q]) {
        self.query_norm = dot(query, query).sqrt();
    }

    #[inline]
    fn compute(&self, query: &[Q], datum: &[T]) -> f32 {
        let (dot, norm_sq) = dot_and_norm(query, datum);

        let denom = self.query_norm * norm_sq.sqrt();
        if denom < f32::EPSILON {
            // Undefined for zero vectors; report orthogonal.
            return 1.0;
        }

        1.0 - (dot / denom).clamp(-1.0, 1.0)
    }
}
