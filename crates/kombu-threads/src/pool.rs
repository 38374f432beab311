//! Fixed-size worker pool.

use crate::partition::Partition;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A pool that can execute a closure over every slice of a partition.
///
/// `run` is synchronous: it returns only once every slice has been
/// processed. Implementations exist for `&P` and `&mut P` so an engine can
/// either own its pool or borrow one from a host index.
pub trait ThreadPool: Sync {
    /// Current number of workers.
    fn size(&self) -> usize;

    /// Invoke `f(slice, worker_id)` for every slice of `partition`.
    ///
    /// Slices cover the partitioned range exactly once; `worker_id` is in
    /// `[0, size())`.
    fn run<F>(&self, partition: Partition, f: F)
    where
        F: Fn(Range<usize>, usize) + Sync;
}

/// A pool whose worker count can change between runs.
///
/// Resizing requires `&mut self`, so it cannot race an in-flight `run`.
pub trait ResizableThreadPool: ThreadPool {
    /// Set the worker count. Zero is promoted to one.
    fn resize(&mut self, workers: usize);
}

/// Fixed-size pool dispatching onto scoped OS threads.
///
/// Workers claim slices through a shared atomic cursor, so a dynamic
/// partition load-balances without any further coordination.
#[derive(Debug, Clone)]
pub struct NativeThreadPool {
    workers: usize,
}

impl NativeThreadPool {
    /// Create a pool with `workers` workers. Zero is promoted to one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }
}

impl Default for NativeThreadPool {
    /// One worker per available CPU.
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl From<usize> for NativeThreadPool {
    fn from(workers: usize) -> Self {
        Self::new(workers)
    }
}

/// Claim slices off `cursor` until the range is exhausted.
fn drain<F>(cursor: &AtomicUsize, slice: usize, len: usize, worker: usize, f: &F)
where
    F: Fn(Range<usize>, usize) + Sync,
{
    loop {
        let start = cursor.fetch_add(slice, Ordering::Relaxed);
        if start >= len {
            return;
        }
        f(start..len.min(start + slice), worker);
    }
}

impl ThreadPool for NativeThreadPool {
    fn size(&self) -> usize {
        self.workers
    }

    fn run<F>(&self, partition: Partition, f: F)
    where
        F: Fn(Range<usize>, usize) + Sync,
    {
        let len = partition.len();
        if len == 0 {
            return;
        }

        let slice = partition.slice_size(self.workers);
        let cursor = AtomicUsize::new(0);

        // Never spawn more workers than there are slices to claim.
        let workers = self.workers.min(kombu_core::div_round_up(len, slice));
        if workers == 1 {
            drain(&cursor, slice, len, 0, &f);
            return;
        }

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let cursor = &cursor;
                let f = &f;
                scope.spawn(move || drain(cursor, slice, len, worker, f));
            }
        });
    }
}

impl ResizableThreadPool for NativeThreadPool {
    fn resize(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }
}

impl<P: ThreadPool> ThreadPool for &P {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn run<F>(&self, partition: Partition, f: F)
    where
        F: Fn(Range<usize>, usize) + Sync,
    {
        (**self).run(partition, f)
    }
}

impl<P: ThreadPool> ThreadPool for &mut P {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn run<F>(&self, partition: Partition, f: F)
    where
        F: Fn(Range<usize>, usize) + Sync,
    {
        (**self).run(partition, f)
    }
}

impl<P: ResizableThreadPool> ResizableThreadPool for &mut P {
    fn resize(&mut self, workers: usize) {
        (**self).resize(workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collect_coverage<P: ThreadPool>(pool: &P, partition: Partition) -> Vec<usize> {
        let seen = Mutex::new(Vec::new());
        pool.run(partition, |range, worker| {
            assert!(worker < pool.size());
            seen.lock().extend(range);
        });
        let mut seen = seen.into_inner();
        seen.sort_unstable();
        seen
    }

    #[test]
    fn test_zero_workers_promoted_to_one() {
        assert_eq!(NativeThreadPool::new(0).size(), 1);

        let mut pool = NativeThreadPool::new(4);
        pool.resize(0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_static_partition_covers_exactly_once() {
        for workers in [1, 2, 4, 8] {
            let pool = NativeThreadPool::new(workers);
            let seen = collect_coverage(&pool, Partition::static_over(103));
            assert_eq!(seen, (0..103).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_dynamic_partition_covers_exactly_once() {
        for chunk_size in [1, 3, 50, 200] {
            let pool = NativeThreadPool::new(4);
            let seen = collect_coverage(&pool, Partition::dynamic_over(103, chunk_size));
            assert_eq!(seen, (0..103).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_empty_partition_is_a_noop() {
        let pool = NativeThreadPool::new(4);
        let seen = collect_coverage(&pool, Partition::static_over(0));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_slices_are_contiguous_and_bounded() {
        let pool = NativeThreadPool::new(3);
        let ranges = Mutex::new(Vec::new());
        pool.run(Partition::dynamic_over(100, 7), |range, _| {
            ranges.lock().push(range);
        });

        let mut ranges = ranges.into_inner();
        ranges.sort_by_key(|r| r.start);
        let mut expected_start = 0;
        for range in &ranges {
            assert_eq!(range.start, expected_start);
            assert!(range.len() <= 7);
            expected_start = range.end;
        }
        assert_eq!(expected_start, 100);
    }

    #[test]
    fn test_borrowed_pool_runs() {
        let pool = NativeThreadPool::new(2);
        let borrowed = &pool;
        let seen = collect_coverage(&borrowed, Partition::static_over(10));
        assert_eq!(seen.len(), 10);
    }

    #[test]
    fn test_run_after_resize() {
        let mut pool = NativeThreadPool::new(1);
        pool.resize(4);
        assert_eq!(pool.size(), 4);
        let seen = collect_coverage(&pool, Partition::static_over(64));
        assert_eq!(seen.len(), 64);
    }
}
