//! Worker pool and partitioners for kombu's parallel loops.
//!
//! The search engine and the compaction primitive both follow the same
//! pattern: split an index range into slices, hand each slice to a worker,
//! and wait for every slice to finish. This crate provides that pattern:
//!
//! - [`Partition`]: static (near-equal contiguous ranges) and dynamic
//!   (fixed-size chunks pulled by idle workers) splitting strategies
//! - [`NativeThreadPool`]: a fixed-size pool of scoped workers with a
//!   synchronous [`ThreadPool::run`] and a between-runs [`resize`]
//! - [`SharedMut`]: an escape hatch for parallel writes to disjoint
//!   indices of one structure
//!
//! [`resize`]: ResizableThreadPool::resize

mod partition;
mod pool;
mod shared;

pub use partition::Partition;
pub use pool::{NativeThreadPool, ResizableThreadPool, ThreadPool};
pub use shared::SharedMut;
