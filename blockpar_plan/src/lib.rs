//! The block grid and chunk planner API for the [`blockpar`](https://docs.rs/blockpar/latest/blockpar/index.html) crate.
//!
//! An array is divided into a grid of 4-element-per-dimension blocks, and consecutive runs of blocks are grouped into chunks according to a [`PartitionPolicy`].
//! A [`ChunkPlan`] is a pure function of the array [`Shape`], its [`ElementType`], and the policy.
//!
//! ## Licence
//! `blockpar_plan` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.

mod element_type;
pub use element_type::ElementType;

mod shape;
pub use shape::{
    BLOCK_EDGE, BlockGrid, BlockSubset, ContiguousLinearisedRanges, MAX_DIMENSIONALITY, Shape,
};

mod partition_policy;
pub use partition_policy::{DEFAULT_ESTIMATED_COMPRESSION_RATIO, PartitionPolicy};

mod chunk_plan;
pub use chunk_plan::{Chunk, ChunkPlan, blocks_per_chunk, plan, validate_block_splits};

use thiserror::Error;

/// A chunk planning error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum PlanError {
    /// An unsupported element type.
    #[error("unsupported element type {0}, expected one of float32, float64, int32, int64")]
    UnsupportedElementType(String),
    /// An invalid dimensionality.
    #[error("invalid dimensionality {0}, expected 1 to {MAX_DIMENSIONALITY}")]
    InvalidDimensionality(usize),
    /// A shape with a zero extent.
    #[error("shape {0:?} has a zero extent")]
    ZeroExtent(Vec<u64>),
    /// A shape with too many elements.
    #[error("the number of elements in shape {0:?} overflows u64")]
    ShapeOverflow(Vec<u64>),
    /// Neither or both of the bytes per chunk and the number of parts were supplied.
    #[error("exactly one of the bytes per chunk or the number of parts must be supplied")]
    AmbiguousPartitionPolicy,
    /// A zero bytes per chunk.
    #[error("the bytes per chunk must be greater than zero")]
    InvalidBytesPerChunk,
    /// An estimated compression ratio that is not finite and positive.
    #[error("invalid estimated compression ratio {0}, expected a finite positive number")]
    InvalidCompressionRatio(f64),
    /// A zero number of parts.
    #[error("the number of parts must be greater than zero")]
    InvalidPartCount,
    /// Block splits that do not partition the block grid.
    #[error("invalid block splits: {0}")]
    InvalidBlockSplits(String),
}
