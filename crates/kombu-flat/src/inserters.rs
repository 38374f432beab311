//! Bounded top-k collection for batched queries.

use kombu_core::{Neighbor, ScoreOrder};
use std::cell::UnsafeCell;
use std::marker::PhantomData;

/// Q independent bounded heaps of capacity k, one per query.
///
/// Each row holds the k best `(id, distance)` pairs seen so far for its
/// query, with the *worst* held pair at the row's root so an insertion is
/// a single comparison in the common reject case. Rows start out filled
/// with sentinels (reserved id, worst possible score), which makes the
/// first k real insertions succeed without a size check.
///
/// Lifecycle: [`prepare`](Self::prepare) → concurrent
/// [`insert`](Self::insert)s → [`cleanup`](Self::cleanup) →
/// [`result`](Self::result).
///
/// # Concurrency
///
/// `insert` takes `&self` so pool workers can share the collector, but
/// callers must serialize insertions per query index: the search engine
/// satisfies this by giving each worker a disjoint query slice for the
/// duration of a data tile. `prepare` and `cleanup` take `&mut self` and
/// therefore cannot overlap any insertion.
pub struct BulkInserter<O: ScoreOrder> {
    slots: UnsafeCell<Vec<Neighbor>>,
    queries: usize,
    capacity: usize,
    _order: PhantomData<O>,
}

// Safety: concurrent access goes through `insert`, whose contract requires
// disjoint query rows per caller; everything else requires `&mut self` or
// runs after the parallel phase.
unsafe impl<O: ScoreOrder> Sync for BulkInserter<O> {}

impl<O: ScoreOrder> BulkInserter<O> {
    /// Create a collector for `queries` queries of `capacity` neighbors
    /// each.
    pub fn new(queries: usize, capacity: usize) -> Self {
        Self {
            slots: UnsafeCell::new(vec![Neighbor::sentinel::<O>(); queries * capacity]),
            queries,
            capacity,
            _order: PhantomData,
        }
    }

    /// Number of query rows.
    pub fn queries(&self) -> usize {
        self.queries
    }

    /// Neighbors retained per query.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset every row to sentinels.
    pub fn prepare(&mut self) {
        self.slots
            .get_mut()
            .fill(Neighbor::sentinel::<O>());
    }

    /// Offer `candidate` to row `query`, keeping the k best.
    ///
    /// O(1) when the candidate loses to the row's current worst, O(log k)
    /// otherwise. Ties resolve to the lower id.
    ///
    /// # Safety
    ///
    /// Callers must serialize insertions per `query`: two threads may call
    /// `insert` concurrently only with distinct `query` values, and no
    /// call may overlap `prepare`, `cleanup`, or `result`.
    #[inline]
    pub unsafe fn insert(&self, query: usize, candidate: Neighbor) {
        debug_assert!(query < self.queries, "query index {query} out of range");
        if self.capacity == 0 {
            return;
        }

        let base = (*self.slots.get()).as_mut_ptr().add(query * self.capacity);
        let row = std::slice::from_raw_parts_mut(base, self.capacity);

        // Root holds the worst retained neighbor; losing to it means the
        // candidate is not top-k.
        if !candidate.beats::<O>(&row[0]) {
            return;
        }

        // Replace the root and sift the candidate down to its place.
        let mut hole = 0;
        loop {
            let left = 2 * hole + 1;
            if left >= self.capacity {
                break;
            }
            let right = left + 1;
            let worst_child = if right < self.capacity && row[left].beats::<O>(&row[right]) {
                right
            } else {
                left
            };
            if !candidate.beats::<O>(&row[worst_child]) {
                break;
            }
            row[hole] = row[worst_child];
            hole = worst_child;
        }
        row[hole] = candidate;
    }

    /// Sort every row best-first. Must run after all insertions and before
    /// [`result`](Self::result).
    pub fn cleanup(&mut self) {
        let capacity = self.capacity;
        if capacity == 0 {
            return;
        }
        for row in self.slots.get_mut().chunks_mut(capacity) {
            row.sort_unstable_by(|a, b| {
                if a.beats::<O>(b) {
                    std::cmp::Ordering::Less
                } else if b.beats::<O>(a) {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            });
        }
    }

    /// The neighbors collected for row `query`, best first.
    ///
    /// Valid after [`cleanup`](Self::cleanup). Rows that saw fewer than k
    /// insertions yield only the real entries; sentinels are trimmed.
    pub fn result(&self, query: usize) -> &[Neighbor] {
        assert!(query < self.queries, "query index {query} out of range");
        // Safety: shared read; the contract above forbids concurrent
        // insertions at this point.
        let slots = unsafe { &*self.slots.get() };
        let row = &slots[query * self.capacity..(query + 1) * self.capacity];
        let valid = row
            .iter()
            .position(Neighbor::is_sentinel)
            .unwrap_or(self.capacity);
        &row[..valid]
    }
}
