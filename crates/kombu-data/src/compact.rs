//! In-place dataset compaction.

use crate::traits::{AccessMode, Dataset, MutableDataset};
use kombu_core::{Error, Result};
use kombu_threads::{Partition, SharedMut, ThreadPool};
use tracing::trace;

/// Rewrite `data` in place so entry `j` becomes the old entry
/// `new_to_old[j]`, for all `j < new_to_old.len()`.
///
/// `new_to_old` must be non-decreasing with every element in
/// `[0, data.size())`. Monotonicity is what makes the rewrite safe without
/// a full copy: within a window, every read position is at or past every
/// write position, so gathering through the scratch `buffer` never clobbers
/// a pending source row.
///
/// The mapping is processed in windows of `buffer.size()`. Each window runs
/// two parallel phases on `pool`: gather the source rows into the buffer,
/// then scatter them back to the head of `data`. Entries at and past
/// `new_to_old.len()` are left untouched; the caller owns communicating the
/// new logical size.
///
/// Fails with a dimension mismatch when `data` and `buffer` disagree on
/// dimensionality; a failed or interrupted compaction leaves `data`
/// partially rewritten.
pub fn compact_data<D, B, P>(
    data: &mut D,
    buffer: &mut B,
    new_to_old: &[usize],
    pool: &P,
) -> Result<()>
where
    D: MutableDataset,
    B: MutableDataset<Elem = D::Elem>,
    P: ThreadPool,
{
    debug_assert!(
        new_to_old.windows(2).all(|w| w[0] <= w[1]),
        "new_to_old must be non-decreasing"
    );
    debug_assert!(
        new_to_old.iter().all(|&old| old < data.size()),
        "new_to_old entry out of range"
    );

    if data.dimensions() != buffer.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: data.dimensions(),
            actual: buffer.dimensions(),
        });
    }
    if new_to_old.is_empty() {
        return Ok(());
    }
    assert!(buffer.size() > 0, "scratch buffer must hold at least one entry");

    let window = buffer.size();
    let mut start = 0;
    while start < new_to_old.len() {
        let stop = (start + window).min(new_to_old.len());
        let count = stop - start;

        // Gather the window's source rows into the buffer.
        {
            let data_view = &*data;
            let buffer_slots = SharedMut::new(&mut *buffer);
            pool.run(Partition::static_over(count), |range, _| {
                for j in range {
                    let old = new_to_old[start + j];
                    // Safety: each worker writes a disjoint range of
                    // buffer slots.
                    unsafe { buffer_slots.get() }
                        .set_datum(j, data_view.get_datum(old, AccessMode::Full));
                }
            });
        }

        // Scatter them back to the head of the dataset.
        {
            let buffer_view = &*buffer;
            let data_slots = SharedMut::new(&mut *data);
            pool.run(Partition::static_over(count), |range, _| {
                for j in range {
                    // Safety: each worker writes a disjoint range of
                    // dataset slots, all below every remaining read.
                    unsafe { data_slots.get() }
                        .set_datum(start + j, buffer_view.get_datum(j, AccessMode::Full));
                }
            });
        }

        trace!(start, stop, "compacted window");
        start = stop;
    }

    Ok(())
}
