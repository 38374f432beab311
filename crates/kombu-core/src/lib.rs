//! Shared primitives for kombu's vector search crates.
//!
//! This crate holds the small pieces every other crate in the workspace
//! builds on:
//!
//! - **Elements**: the [`VectorElement`] trait and the [`DType`] runtime tag
//!   (f32, f16, i8, u8)
//! - **Score ordering**: the [`ScoreOrder`] polarity trait with the
//!   [`Minimize`] / [`Maximize`] strategies and their sentinel scores
//! - **Neighbors**: the [`Neighbor`] `(id, distance)` pair with an
//!   id-tie-broken total order
//! - **Versioning**: the [`Version`] triple stamped into serialized
//!   artifacts
//!
//! # Architecture
//!
//! ```text
//! kombu-core  <-- kombu-distance  <-- kombu-data  <-- kombu-flat
//!      ^------------ kombu-threads ------------------------^
//! ```

mod element;
mod neighbor;
mod order;
mod version;

pub use element::{DType, VectorElement};
pub use neighbor::Neighbor;
pub use order::{Maximize, Minimize, ScoreOrder};
pub use version::Version;

/// Error type shared across the kombu crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unsupported file format: {0}")]
    UnknownFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("allocation failed: {0}")]
    Allocation(String),
}

/// Result type shared across the kombu crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Divide `numerator` by `denominator`, rounding up.
#[inline]
pub fn div_round_up(numerator: usize, denominator: usize) -> usize {
    debug_assert!(denominator > 0, "division by zero");
    numerator.div_ceil(denominator)
}
