//! Contiguous in-memory dataset storage.

use crate::traits::{AccessMode, Dataset, DistanceAdapter, MutableDataset};
use kombu_core::{Error, Result, VectorElement};
use kombu_distance::Distance;

/// Row-major in-memory vector storage.
///
/// The workhorse dataset: a single contiguous allocation of
/// `size * dimensions` elements. Entry `i` occupies
/// `[i * dimensions, (i + 1) * dimensions)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleData<T> {
    elements: Vec<T>,
    dimensions: usize,
}

impl<T: VectorElement> SimpleData<T> {
    /// Allocate a zero-filled dataset of `size` entries of `dimensions`
    /// elements each.
    ///
    /// Allocation failure surfaces as [`Error::Allocation`] instead of
    /// aborting.
    pub fn new(size: usize, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        let len = size
            .checked_mul(dimensions)
            .ok_or_else(|| Error::Allocation(format!("{size} x {dimensions} overflows")))?;

        let mut elements = Vec::new();
        elements
            .try_reserve_exact(len)
            .map_err(|e| Error::Allocation(e.to_string()))?;
        elements.resize(len, T::default());

        Ok(Self {
            elements,
            dimensions,
        })
    }

    /// Wrap a flat row-major buffer.
    ///
    /// The buffer length must be a multiple of `dimensions`.
    pub fn from_flat(elements: Vec<T>, dimensions: usize) -> Result<Self> {
        if dimensions == 0 || elements.len() % dimensions != 0 {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: elements.len(),
            });
        }
        Ok(Self {
            elements,
            dimensions,
        })
    }

    /// Build from a slice of rows, which must all share one length.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let dimensions = rows.first().map_or(0, Vec::len);
        let mut elements = Vec::with_capacity(rows.len() * dimensions);
        for row in rows {
            if row.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: row.len(),
                });
            }
            elements.extend_from_slice(row);
        }
        Self::from_flat(elements, dimensions.max(1))
    }

    /// The whole storage as one row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T: VectorElement> Dataset for SimpleData<T> {
    type Elem = T;

    fn size(&self) -> usize {
        self.elements.len() / self.dimensions
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[inline]
    fn get_datum(&self, i: usize, _mode: AccessMode) -> &[T] {
        debug_assert!(i < self.size(), "index {i} out of range");
        &self.elements[i * self.dimensions..(i + 1) * self.dimensions]
    }

    #[inline]
    fn prefetch(&self, i: usize) {
        #[cfg(target_arch = "x86_64")]
        {
            use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
            if i < self.size() {
                let ptr = self.elements[i * self.dimensions..].as_ptr();
                // Prefetch hints never fault, even on bad addresses.
                unsafe { _mm_prefetch::<_MM_HINT_T0>(ptr as *const i8) };
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = i;
    }
}

impl<T: VectorElement> MutableDataset for SimpleData<T> {
    #[inline]
    fn set_datum(&mut self, i: usize, datum: &[T]) {
        debug_assert!(i < self.size(), "index {i} out of range");
        assert_eq!(datum.len(), self.dimensions, "datum dimension mismatch");
        let start = i * self.dimensions;
        self.elements[start..start + self.dimensions].copy_from_slice(datum);
    }
}

impl<Q, D, T> DistanceAdapter<Q, D> for SimpleData<T>
where
    Q: VectorElement,
    T: VectorElement,
    D: Distance<Q, T>,
{
    type Adapted = D;

    /// Plain storage evaluates distances directly on its elements.
    fn adapt_distance(&self, distance: &D) -> D {
        distance.clone()
    }
}
