//! Exhaustive (flat) exact nearest-neighbor search.
//!
//! The flat engine computes the distance between every query and every
//! dataset entry, keeping the k best per query. It is the reference other
//! index structures are validated against: slower than any approximate
//! method, but exact by construction.
//!
//! # Hot path
//!
//! The work is tiled twice for cache locality:
//!
//! ```text
//! search:        tile the dataset into data batches
//!   search_subset:   dynamically partition queries across pool workers
//!     search_patch:      one worker, one query slice x one data tile;
//!                        per-query fixed distance functors, top-k inserts
//! ```
//!
//! The outer loop runs over data so a loaded dataset row is reused across
//! every query in a worker's slice; the inner broadcast keeps each query's
//! fixed-argument state hot in its own functor copy.
//!
//! # Ownership
//!
//! [`FlatIndex`] is generic over how it holds its dataset and pool. Pass
//! values to own them, references to borrow them — [`scoped_flat_index`]
//! builds the borrowed form a host index uses to run exact validation
//! passes over its own storage.

mod flat;
mod inserters;
mod result;

pub use flat::{scoped_flat_index, FlatIndex, DEFAULT_DATA_BATCH_SIZE};
pub use inserters::BulkInserter;
pub use result::QueryResult;
