//! Unsynchronized shared mutation over disjoint indices.

use std::marker::PhantomData;

/// A handle that lets pool workers mutate one structure in parallel.
///
/// Rust's aliasing rules forbid handing the same `&mut T` to several
/// workers even when each of them touches disjoint indices. `SharedMut`
/// erases the exclusivity for the duration of a parallel region: it holds
/// the borrow as a raw pointer and re-materializes mutable access inside
/// each worker.
///
/// The gather/scatter loops in dataset compaction and the per-row result
/// write-back in the flat engine are the intended users: every worker owns
/// a disjoint slice of indices, so their writes never overlap.
pub struct SharedMut<'a, T: ?Sized> {
    target: *mut T,
    _marker: PhantomData<&'a mut T>,
}

// The handle moves between workers; the underlying access rules are the
// caller's obligation via `get`.
unsafe impl<T: ?Sized + Send> Send for SharedMut<'_, T> {}
unsafe impl<T: ?Sized + Send> Sync for SharedMut<'_, T> {}

impl<'a, T: ?Sized> SharedMut<'a, T> {
    /// Wrap an exclusive borrow for the duration of a parallel region.
    pub fn new(target: &'a mut T) -> Self {
        Self {
            target,
            _marker: PhantomData,
        }
    }

    /// Re-materialize mutable access.
    ///
    /// # Safety
    ///
    /// Concurrent callers must mutate disjoint state: two workers may hold
    /// the result simultaneously only if the index sets they touch through
    /// it never overlap, and nothing else reads the state they write.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get(&self) -> &mut T {
        &mut *self.target
    }
}
