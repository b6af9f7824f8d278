//! # quire-vector
//!
//! An immutable, exact nearest-neighbour index for embedding vectors, with
//! checksummed on-disk snapshots.
//!
//! ## Features
//!
//! - **Exact search**: every query is scored against every record, so results
//!   are deterministic and ties are broken by insertion order
//! - **Read-only after build**: [`VectorIndex`] has no mutating methods and
//!   can be shared across threads behind an `Arc` without locks
//! - **Multiple Distance Metrics**: Cosine, Euclidean (L2), Dot Product
//! - **Safe persistence**: snapshots are staged and renamed into place, and
//!   verified against a SHA-256 checksum on load
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quire_vector::{persistence, DistanceMetric, IndexBuilder, Record, VectorMetadata};
//!
//! let mut builder = IndexBuilder::new(3, DistanceMetric::Cosine)?;
//! builder.push(Record::new("a", vec![1.0, 0.0, 0.0], "first passage", VectorMetadata::new()))?;
//! let index = builder.finish();
//!
//! persistence::save(&index, "data/index".as_ref(), "my-embedder").await?;
//! let snapshot = persistence::load("data/index".as_ref()).await?;
//! let hits = snapshot.index.search(&[1.0, 0.0, 0.0], 4)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod distance;
pub mod error;
pub mod index;
pub mod persistence;
pub mod types;

// Re-exports for convenience
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::{IndexBuilder, VectorIndex};
pub use persistence::{Manifest, Snapshot};
pub use types::{MetadataValue, Record, RecordId, SearchHit, VectorMetadata};
