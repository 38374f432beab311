//! Dataset storage for kombu vector search.
//!
//! A dataset is a random-access container of fixed-dimensional vectors.
//! This crate provides:
//!
//! - The [`Dataset`] / [`MutableDataset`] contracts with [`AccessMode`]
//!   hints and the [`DistanceAdapter`] seam through which storage layouts
//!   specialize a distance functor
//! - [`SimpleData`]: contiguous row-major in-memory storage
//! - File loaders and savers ([`io`]): the native container format (with a
//!   stamped format version), the vecs record family, and DiskANN-style
//!   `.bin` files, dispatched by extension
//! - [`compact_data`]: in-place rewrite of a dataset under a monotone
//!   new-to-old index mapping, using a bounded scratch dataset
//!
//! Datasets are shared read-only during search; `get_datum` on distinct
//! indices is safe from any number of threads.

mod compact;
pub mod io;
mod simple;
mod traits;

pub use compact::compact_data;
pub use simple::SimpleData;
pub use traits::{copy_data, AccessMode, Dataset, DistanceAdapter, MutableDataset};
