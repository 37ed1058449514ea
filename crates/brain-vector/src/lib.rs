//! # brain-vector
//!
//! Nearest-neighbour search over stored memory records.
//!
//! The index borrows the records it searches and owns no record data.
//! [`FlatIndex`] is an exact full scan scoring each record by cosine
//! distance, which for unit vectors is `1 - dot(query, record)`. Callers
//! depend on the [`VectorIndex`] trait so an approximate index can replace
//! it once corpora grow past what a scan handles comfortably.

pub mod error;
pub mod flat;
pub mod index;

pub use error::VectorError;
pub use flat::{cosine_distance, FlatIndex};
pub use index::{Neighbor, VectorIndex};
