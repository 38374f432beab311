//! Distance functors for kombu vector search.
//!
//! A distance is three things bundled together:
//!
//! - a **comparator polarity** ([`ScoreOrder`]) saying whether lower or
//!   higher raw scores mean "nearer" — the engine never assumes either
//! - an optional **fixed argument**: query-dependent state precomputed once
//!   per query (e.g. the query norm for cosine)
//! - the **kernel** computing a score between a query and a dataset entry
//!
//! Provided metrics:
//!
//! - [`SquaredL2`]: squared Euclidean distance (no square root; ordering is
//!   identical and the sqrt costs for nothing on the hot path)
//! - [`InnerProduct`]: raw dot product, maximized
//! - [`Cosine`]: cosine distance `1 - cos(q, x)`, minimized
//!
//! [`BroadcastDistance`] replicates a functor so one worker can hold an
//! independently-fixed copy per query in its slice.
//!
//! All kernels widen elements to `f32` and accumulate in 4-wide unrolled
//! loops, which the compiler auto-vectorizes in release builds.
//!
//! [`ScoreOrder`]: kombu_core::ScoreOrder

mod broadcast;
mod functions;

pub use broadcast::BroadcastDistance;
pub use functions::{Cosine, InnerProduct, SquaredL2};

use kombu_core::{ScoreOrder, VectorElement};

/// A distance functor comparing queries of element type `Q` with dataset
/// entries of element type `T`.
///
/// Functors are cheap to clone: the engine treats the user-supplied value
/// as a prototype and clones one copy per query in a worker's slice.
pub trait Distance<Q: VectorElement, T: VectorElement>: Clone + Send + Sync {
    /// "Better first" polarity of the scores this functor produces.
    type Order: ScoreOrder;

    /// Precompute query-dependent state. The default is a no-op.
    ///
    /// `compute` for the same functor instance is only called with the
    /// query most recently fixed.
    fn fix_argument(&mut self, _query: &[Q]) {}

    /// Score `datum` against `query`.
    fn compute(&self, query: &[Q], datum: &[T]) -> f32;
}
