//! The flat index: exhaustive exact search.

use crate::inserters::BulkInserter;
use crate::result::QueryResult;
use kombu_core::{div_round_up, Error, Neighbor, Result, ScoreOrder};
use kombu_data::{AccessMode, Dataset, DistanceAdapter};
use kombu_distance::{BroadcastDistance, Distance};
use kombu_threads::{NativeThreadPool, Partition, ResizableThreadPool, SharedMut, ThreadPool};
use std::ops::Range;
use tracing::trace;

/// Data-tile size used when the configured batch size is 0 (automatic).
pub const DEFAULT_DATA_BATCH_SIZE: usize = 100_000;

/// Exhaustive exact nearest-neighbor index.
///
/// Scores every dataset entry against every query and returns the k best
/// per query under the distance functor's own comparator. Exact by
/// construction (up to the functor's floating-point error), and therefore
/// the baseline approximate indexes are validated against.
///
/// The type is generic over how it holds its dataset and thread pool:
/// instantiate with values to own them, or with references (see
/// [`scoped_flat_index`]) to borrow both from a host index for the
/// duration of a validation pass. Both forms run the same code.
pub struct FlatIndex<D, Dist, P = NativeThreadPool> {
    data: D,
    distance: Dist,
    threadpool: P,
    // 0 means automatic for both tuning knobs.
    data_batch_size: usize,
    query_batch_size: usize,
}

impl<D: Dataset, Dist> FlatIndex<D, Dist, NativeThreadPool> {
    /// Create an owning index with a freshly built pool of `threads`
    /// workers (zero is promoted to one).
    pub fn new(data: D, distance: Dist, threads: usize) -> Self {
        Self::with_pool(data, distance, NativeThreadPool::new(threads))
    }
}

/// Borrow an existing dataset and pool as a short-lived flat index.
///
/// This is how a host index runs an exact validation pass over storage it
/// owns without handing it over.
pub fn scoped_flat_index<'a, D, Dist, P>(
    data: &'a D,
    distance: Dist,
    threadpool: &'a P,
) -> FlatIndex<&'a D, Dist, &'a P>
where
    D: Dataset,
    P: ThreadPool,
{
    FlatIndex::with_pool(data, distance, threadpool)
}

impl<D, Dist, P> FlatIndex<D, Dist, P>
where
    D: Dataset,
    P: ThreadPool,
{
    /// Assemble an index from its parts. `data` and `threadpool` may be
    /// values or references.
    pub fn with_pool(data: D, distance: Dist, threadpool: P) -> Self {
        Self {
            data,
            distance,
            threadpool,
            data_batch_size: 0,
            query_batch_size: 0,
        }
    }

    /// Number of indexed entries.
    pub fn size(&self) -> usize {
        self.data.size()
    }

    /// Dimensionality of the indexed vectors.
    pub fn dimensions(&self) -> usize {
        self.data.dimensions()
    }

    /// Configured data-tile size; 0 means automatic.
    pub fn get_data_batch_size(&self) -> usize {
        self.data_batch_size
    }

    /// Set the data-tile size; 0 restores automatic sizing.
    pub fn set_data_batch_size(&mut self, data_batch_size: usize) {
        self.data_batch_size = data_batch_size;
    }

    /// Configured per-worker query-slice size; 0 means automatic.
    pub fn get_query_batch_size(&self) -> usize {
        self.query_batch_size
    }

    /// Set the per-worker query-slice size; 0 restores automatic sizing.
    pub fn set_query_batch_size(&mut self, query_batch_size: usize) {
        self.query_batch_size = query_batch_size;
    }

    /// Whether the worker count can change between searches.
    pub fn can_change_threads() -> bool {
        true
    }

    /// Current number of search workers.
    pub fn get_num_threads(&self) -> usize {
        self.threadpool.size()
    }

    fn compute_data_batch_size(&self) -> usize {
        let n = self.data.size();
        if self.data_batch_size == 0 {
            DEFAULT_DATA_BATCH_SIZE.min(n).max(1)
        } else {
            self.data_batch_size.min(n).max(1)
        }
    }

    // Automatic behavior: spread the queries evenly over the workers.
    fn compute_query_batch_size(&self, queries: usize) -> usize {
        if self.query_batch_size == 0 {
            div_round_up(queries, self.threadpool.size()).max(1)
        } else {
            self.query_batch_size
        }
    }

    /// Return the `k` nearest neighbors of every query.
    ///
    /// Row `i` of the result holds the neighbors of query `i`, nearest
    /// first under the distance's comparator, ties broken by lower id.
    pub fn search<Q>(&self, queries: &Q, k: usize) -> Result<QueryResult>
    where
        Q: Dataset,
        D: DistanceAdapter<Q::Elem, Dist>,
        Dist: Distance<Q::Elem, D::Elem>,
    {
        self.search_filtered(queries, k, |_| true)
    }

    /// Like [`search`](Self::search), considering only dataset indices for
    /// which `predicate` returns true.
    pub fn search_filtered<Q, Pred>(
        &self,
        queries: &Q,
        k: usize,
        predicate: Pred,
    ) -> Result<QueryResult>
    where
        Q: Dataset,
        D: DistanceAdapter<Q::Elem, Dist>,
        Dist: Distance<Q::Elem, D::Elem>,
        Pred: Fn(usize) -> bool + Sync,
    {
        let mut result = QueryResult::new(queries.size(), k);
        self.search_into(queries, &mut result, predicate)?;
        Ok(result)
    }

    /// Fill a caller-provided result in place; `k` is taken from the
    /// result's shape.
    ///
    /// Fails when the queries disagree with the dataset on dimensionality
    /// or with the result on query count. A failed search leaves `result`
    /// in an unspecified state.
    pub fn search_into<Q, Pred>(
        &self,
        queries: &Q,
        result: &mut QueryResult,
        predicate: Pred,
    ) -> Result<()>
    where
        Q: Dataset,
        D: DistanceAdapter<Q::Elem, Dist>,
        Dist: Distance<Q::Elem, D::Elem>,
        Pred: Fn(usize) -> bool + Sync,
    {
        if queries.dimensions() != self.data.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.data.dimensions(),
                actual: queries.dimensions(),
            });
        }
        if result.n_queries() != queries.size() {
            return Err(Error::DimensionMismatch {
                expected: queries.size(),
                actual: result.n_queries(),
            });
        }

        let k = result.n_neighbors();
        let mut sorter: BulkInserter<
            <<D as DistanceAdapter<Q::Elem, Dist>>::Adapted as Distance<Q::Elem, D::Elem>>::Order,
        > = BulkInserter::new(queries.size(), k);
        sorter.prepare();

        // Tile the dataset so all workers stay within one sub-region at a
        // time, then sweep every query over each tile.
        let data_batch_size = self.compute_data_batch_size();
        trace!(
            queries = queries.size(),
            k,
            data_batch_size,
            "flat search"
        );

        let mut start = 0;
        while start < self.data.size() {
            let stop = (start + data_batch_size).min(self.data.size());
            self.search_subset(queries, start..stop, &sorter, &predicate);
            start = stop;
        }

        // Every query has now met every dataset element. Finalize the
        // heaps and write rows back in parallel.
        sorter.cleanup();
        let result_rows = SharedMut::new(result);
        self.threadpool
            .run(Partition::static_over(queries.size()), |rows, _| {
                for i in rows {
                    // Safety: workers write disjoint result rows.
                    unsafe { result_rows.get() }.set_row(i, sorter.result(i));
                }
            });
        Ok(())
    }

    /// Multi-threaded search of all queries over one data tile.
    ///
    /// Queries are partitioned dynamically: slices of
    /// `compute_query_batch_size` are pulled by idle workers, which
    /// balances load when a predicate skews per-query cost.
    fn search_subset<Q, Pred, O>(
        &self,
        queries: &Q,
        data_indices: Range<usize>,
        sorter: &BulkInserter<O>,
        predicate: &Pred,
    ) where
        Q: Dataset,
        D: DistanceAdapter<Q::Elem, Dist>,
        Dist: Distance<Q::Elem, D::Elem>,
        <D as DistanceAdapter<Q::Elem, Dist>>::Adapted: Distance<Q::Elem, D::Elem, Order = O>,
        O: ScoreOrder,
        Pred: Fn(usize) -> bool + Sync,
    {
        let query_batch_size = self.compute_query_batch_size(queries.size());
        self.threadpool.run(
            Partition::dynamic_over(queries.size(), query_batch_size),
            |query_indices, _worker| {
                // One independently fixed functor per query in the slice.
                let mut distances: BroadcastDistance<
                    <D as DistanceAdapter<Q::Elem, Dist>>::Adapted,
                > = BroadcastDistance::new(
                    self.data.adapt_distance(&self.distance),
                    query_indices.len(),
                );
                for (slot, qi) in query_indices.clone().enumerate() {
                    distances[slot].fix_argument(queries.get_datum(qi, AccessMode::Full));
                }

                self.search_patch(
                    queries,
                    data_indices.clone(),
                    query_indices,
                    sorter,
                    &mut distances,
                    predicate,
                );
            },
        );
    }

    /// Single-threaded kernel over one query slice x one data tile.
    ///
    /// Data is the outer loop so the fetched row is reused across every
    /// query in the slice.
    fn search_patch<Q, Pred, O>(
        &self,
        queries: &Q,
        data_indices: Range<usize>,
        query_indices: Range<usize>,
        sorter: &BulkInserter<O>,
        distances: &mut BroadcastDistance<<D as DistanceAdapter<Q::Elem, Dist>>::Adapted>,
        predicate: &Pred,
    ) where
        Q: Dataset,
        D: DistanceAdapter<Q::Elem, Dist>,
        Dist: Distance<Q::Elem, D::Elem>,
        <D as DistanceAdapter<Q::Elem, Dist>>::Adapted: Distance<Q::Elem, D::Elem, Order = O>,
        O: ScoreOrder,
        Pred: Fn(usize) -> bool + Sync,
    {
        debug_assert!(distances.len() >= query_indices.len());

        let stop = data_indices.end;
        for data_index in data_indices {
            if !predicate(data_index) {
                continue;
            }

            // Pull the next row toward cache while this one is scored.
            if data_index + 1 < stop {
                self.data.prefetch(data_index + 1);
            }
            let datum = self.data.get_datum(data_index, AccessMode::Full);

            for (slot, qi) in query_indices.clone().enumerate() {
                let score =
                    distances[slot].compute(queries.get_datum(qi, AccessMode::Full), datum);
                // Safety: this worker owns the slice containing `qi` for
                // the duration of the tile; slices are disjoint.
                unsafe { sorter.insert(qi, Neighbor::new(data_index, score)) };
            }
        }
    }
}

impl<D, Dist, P> FlatIndex<D, Dist, P>
where
    D: Dataset,
    P: ResizableThreadPool,
{
    /// Set the number of search workers. Zero is promoted to one. Only
    /// callable between searches (`&mut self`).
    pub fn set_num_threads(&mut self, threads: usize) {
        self.threadpool.resize(threads);
    }
}
