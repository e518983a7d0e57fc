//! `blockpar` is a Rust library for chunked parallel compression of multidimensional numeric arrays with block codecs.
//!
//! An array of 1 to 4 dimensions is held uncompressed in a single [`SharedBuffer`] and divided into a grid of blocks with up to 4 elements per dimension.
//! A [`ChunkPlan`] groups consecutive runs of blocks into chunks, either sized to a compressed byte target ([`PartitionPolicy::CacheTarget`]) or to a number of parts ([`PartitionPolicy::EqualCount`]).
//! Chunks are compressed or decompressed in parallel by a pool of workers, each with access to only the disjoint region of the buffer covered by its chunk.
//!
//! The block codec is a [`BlockCodecTraits`](codec::BlockCodecTraits) implementation.
//! `blockpar` includes a [zfp](https://zfp.io/) codec, [`ZfpCodec`](codec::ZfpCodec), supporting error-tolerance, fixed-rate, and fixed-precision [modes](codec::CodecMode).
//!
//! Compressed chunks and the [layout header](layout::LayoutHeader) describing the array dimensions, chunk boundaries, and artifact locations can be persisted with the [`layout`] module.
//!
//! ## Example
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use blockpar::{
//!     ChunkedArray, ChunkedArrayBuilder, ElementType, ParallelOptions,
//!     codec::{CodecMode, ZfpCodec},
//!     layout::{ArtifactStorage, read_artifacts, read_header, write_artifacts},
//! };
//! # let dir = tempfile::tempdir()?;
//! # let dir = dir.path();
//!
//! let mut array = ChunkedArrayBuilder::new(vec![64, 64], ElementType::Float32)
//!     .bytes_per_chunk(4096)
//!     .build()?;
//! array.buffer_mut().as_slice_mut::<f32>()?.fill(1.5);
//!
//! let options = ParallelOptions::default();
//! let artifacts = array.compress(&CodecMode::Tolerance(1e-3), &options)?;
//! let files = write_artifacts(dir, "array", &artifacts, ArtifactStorage::PerChunk)?;
//! array.layout_header(files).write(dir.join("array.json"))?;
//!
//! let header = read_header(dir.join("array.json"))?;
//! let mut restored = ChunkedArray::from_header(
//!     &header,
//!     ElementType::Float32,
//!     std::sync::Arc::new(ZfpCodec::new()),
//! )?;
//! let artifacts = read_artifacts(dir, header.compressed_files(), header.num_chunks())?;
//! restored.decompress(&artifacts, &options)?;
//! assert!(restored.buffer().as_slice::<f32>()?.iter().all(|&v| (v - 1.5).abs() <= 1e-3));
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Features
//! #### Default
//!  - `ndarray`: [`ndarray`] views of a [`SharedBuffer`].
//!  - `zfp`: the [`ZfpCodec`](codec::ZfpCodec) block codec, built on [`zfp-sys`](https://docs.rs/zfp-sys/latest/zfp_sys/), and the default codec of a [`ChunkedArrayBuilder`].
//!
//! ## Licence
//! `blockpar` is licensed under either of
//!  - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//!  - the MIT license <http://opensource.org/licenses/MIT>, at your option.
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod config;
pub mod layout;

mod array_errors;
mod buffer;
mod chunked_array;
mod element;
mod orchestrator;

pub use array_errors::{ArrayError, BufferError};
pub use buffer::{ChunkRegion, ChunkRegionMut, SharedBuffer};
pub use chunked_array::{ChunkedArray, ChunkedArrayBuilder};
pub use element::Element;
pub use orchestrator::{ParallelOptions, compress_chunks, decompress_chunks};

pub use blockpar_plan::{
    BLOCK_EDGE, BlockGrid, BlockSubset, Chunk, ChunkPlan, ElementType, MAX_DIMENSIONALITY,
    PartitionPolicy, PlanError, Shape, plan, validate_block_splits,
};
