//! Dataset contracts.

use kombu_core::{Error, Result, VectorElement};
use kombu_distance::Distance;

/// Hint telling a dataset which representation the caller needs.
///
/// This is a capability hint, not a permission: a dataset is free to return
/// the same handle for both modes. `Fast` asks for the cheapest
/// possibly-lossy handle (e.g. a primary residual of a two-level code);
/// `Full` requires fidelity sufficient for final distance evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Cheapest available representation; may be lossy.
    Fast,
    /// Full-fidelity representation. The default.
    #[default]
    Full,
}

/// A random-access container of fixed-dimensional vectors.
///
/// `size()` and `dimensions()` are stable for the container's lifetime.
/// Indices are `[0, size())`; out-of-range access is a programming error
/// and is only checked in debug builds on the hot path.
///
/// Concurrent reads at distinct indices are safe from any number of
/// threads.
pub trait Dataset: Send + Sync {
    /// Element type of the stored vectors.
    type Elem: VectorElement;

    /// Number of entries.
    fn size(&self) -> usize;

    /// Dimensionality shared by every entry.
    fn dimensions(&self) -> usize;

    /// Read-only handle to entry `i`.
    ///
    /// The handle is only guaranteed valid until the next dataset call on
    /// the same thread.
    fn get_datum(&self, i: usize, mode: AccessMode) -> &[Self::Elem];

    /// Best-effort cache prefetch of entry `i`. May be a no-op; must not
    /// mutate observable state.
    #[inline]
    fn prefetch(&self, _i: usize) {}
}

/// A dataset whose element values may change.
///
/// Mutability does not imply resizability: the entry count is fixed.
/// Writes to an index require exclusion with all readers of that index.
pub trait MutableDataset: Dataset {
    /// Overwrite entry `i` with `datum`.
    fn set_datum(&mut self, i: usize, datum: &[Self::Elem]);
}

/// The seam through which a dataset specializes a distance functor for its
/// storage layout.
///
/// Plain storage hands the functor back unchanged. A quantized dataset
/// would instead return a codec-aware functor operating on compressed
/// codes; the search engine treats whatever comes back as opaque.
pub trait DistanceAdapter<Q, D>: Dataset
where
    Q: VectorElement,
    D: Distance<Q, Self::Elem>,
{
    /// The specialized functor type.
    type Adapted: Distance<Q, Self::Elem>;

    /// Specialize `distance` for this dataset.
    fn adapt_distance(&self, distance: &D) -> Self::Adapted;
}

impl<D: Dataset> Dataset for &D {
    type Elem = D::Elem;

    fn size(&self) -> usize {
        (**self).size()
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    #[inline]
    fn get_datum(&self, i: usize, mode: AccessMode) -> &[Self::Elem] {
        (**self).get_datum(i, mode)
    }

    #[inline]
    fn prefetch(&self, i: usize) {
        (**self).prefetch(i)
    }
}

impl<Q, Dist, D> DistanceAdapter<Q, Dist> for &D
where
    Q: VectorElement,
    D: DistanceAdapter<Q, Dist>,
    Dist: Distance<Q, D::Elem>,
{
    type Adapted = D::Adapted;

    fn adapt_distance(&self, distance: &Dist) -> Self::Adapted {
        (**self).adapt_distance(distance)
    }
}

/// Copy every entry of `input` into `output`.
///
/// Both containers must agree on entry count and dimensionality.
pub fn copy_data<I, O>(input: &I, output: &mut O) -> Result<()>
where
    I: Dataset,
    O: MutableDataset<Elem = I::Elem>,
{
    if input.size() != output.size() {
        return Err(Error::DimensionMismatch {
            expected: input.size(),
            actual: output.size(),
        });
    }
    if input.dimensions() != output.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: input.dimensions(),
            actual: output.dimensions(),
        });
    }

    for i in 0..input.size() {
        output.set_datum(i, input.get_datum(i, AccessMode::Full));
    }
    Ok(())
}
