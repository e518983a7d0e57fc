//! Parallel compression and decompression of the chunks of a [`SharedBuffer`].
//!
//! ### Chunk artifact format
//! A compressed chunk is the number of blocks in the chunk (`u32` little-endian) followed by each block in block order as
//! its encoded length (`u32` little-endian) and the encoded bytes.

use blockpar_codec::{BlockCodecTraits, BlockRepresentation, CodecMode};
use blockpar_plan::ChunkPlan;
use rayon::prelude::*;

use crate::{ArrayError, ChunkRegion, ChunkRegionMut, SharedBuffer, config::global_config};

/// Options for parallel compression and decompression.
///
/// The default worker count is the [global worker count](crate::config::Config#worker-count).
#[derive(Debug, Clone, Copy)]
pub struct ParallelOptions {
    worker_count: usize,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            worker_count: global_config().worker_count(),
        }
    }
}

impl ParallelOptions {
    /// Return the worker count.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Set the worker count.
    pub fn set_worker_count(&mut self, worker_count: usize) -> &mut Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the worker count.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

fn worker_pool(options: &ParallelOptions) -> Result<rayon::ThreadPool, ArrayError> {
    if options.worker_count() == 0 {
        return Err(ArrayError::InvalidWorkerCount);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(options.worker_count())
        .build()
        .map_err(|err| ArrayError::WorkerPoolError(err.to_string()))
}

fn malformed(chunk: usize, reason: impl Into<String>) -> ArrayError {
    ArrayError::MalformedArtifact {
        chunk,
        reason: reason.into(),
    }
}

fn push_u32(artifact: &mut Vec<u8>, chunk: usize, value: usize) -> Result<(), ArrayError> {
    let value = u32::try_from(value)
        .map_err(|_| malformed(chunk, format!("{value} does not fit in the artifact framing")))?;
    artifact.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

fn take<'a>(bytes: &mut &'a [u8], len: usize) -> Option<&'a [u8]> {
    let (head, tail) = bytes.split_at_checked(len)?;
    *bytes = tail;
    Some(head)
}

fn take_u32(bytes: &mut &[u8]) -> Option<u32> {
    let mut value = [0; 4];
    value.copy_from_slice(take(bytes, 4)?);
    Some(u32::from_le_bytes(value))
}

fn encode_chunk(
    region: &ChunkRegion<'_>,
    element_type: blockpar_plan::ElementType,
    codec: &dyn BlockCodecTraits,
    mode: &CodecMode,
) -> Result<Vec<u8>, ArrayError> {
    let chunk = region.chunk();
    let blocks = region.blocks();
    let mut artifact = Vec::new();
    push_u32(&mut artifact, chunk, blocks.clone().count())?;
    let mut decoded = Vec::new();
    for block in blocks {
        let subset = region.read_block(block, &mut decoded)?;
        let representation = BlockRepresentation::from_subset(&subset, element_type);
        let encoded = codec
            .encode_block(&decoded, &representation, mode)
            .map_err(|source| ArrayError::ChunkCodecError { chunk, source })?;
        push_u32(&mut artifact, chunk, encoded.len())?;
        artifact.extend_from_slice(&encoded);
    }
    log::trace!(
        "compressed chunk {chunk} ({} bytes) to {} bytes",
        region.num_bytes(),
        artifact.len()
    );
    Ok(artifact)
}

fn decode_chunk(
    region: &mut ChunkRegionMut<'_>,
    element_type: blockpar_plan::ElementType,
    mut artifact: &[u8],
    codec: &dyn BlockCodecTraits,
) -> Result<(), ArrayError> {
    let chunk = region.chunk();
    let blocks = region.blocks();
    let num_blocks =
        take_u32(&mut artifact).ok_or_else(|| malformed(chunk, "missing block count"))?;
    if u64::from(num_blocks) != blocks.end - blocks.start {
        return Err(malformed(
            chunk,
            format!(
                "the artifact has {num_blocks} blocks, expected {}",
                blocks.end - blocks.start
            ),
        ));
    }
    let mut decoded = Vec::new();
    for block in blocks {
        let len = take_u32(&mut artifact)
            .ok_or_else(|| malformed(chunk, format!("missing length of block {block}")))?;
        let encoded = take(&mut artifact, len as usize)
            .ok_or_else(|| malformed(chunk, format!("block {block} is truncated")))?;
        let subset = region.block_subset(block)?;
        let representation = BlockRepresentation::from_subset(&subset, element_type);
        decoded.clear();
        decoded.resize(representation.size(), 0);
        codec
            .decode_block(encoded, &representation, &mut decoded)
            .map_err(|source| ArrayError::ChunkCodecError { chunk, source })?;
        region.write_block(block, &decoded)?;
    }
    if !artifact.is_empty() {
        return Err(malformed(
            chunk,
            format!("{} trailing bytes", artifact.len()),
        ));
    }
    log::trace!("decompressed chunk {chunk}");
    Ok(())
}

/// Compress every chunk of `plan` in parallel.
///
/// Each chunk is compressed by one task with read-only access to its region of `buffer`, encoding every block of the chunk with `codec`.
/// The compressed artifacts are returned in chunk index order.
///
/// # Errors
/// Returns an [`ArrayError`] if
///  - `mode` is invalid,
///  - `plan` does not match the shape and element type of `buffer`,
///  - the worker count is zero or the worker pool cannot be started, or
///  - the codec fails to encode any block ([`ArrayError::ChunkCodecError`]).
///
/// Nothing is dispatched if any of the first three checks fail.
pub fn compress_chunks(
    buffer: &SharedBuffer,
    plan: &ChunkPlan,
    codec: &dyn BlockCodecTraits,
    mode: &CodecMode,
    options: &ParallelOptions,
) -> Result<Vec<Vec<u8>>, ArrayError> {
    mode.validate()?;
    let regions = buffer.regions(plan)?;
    let pool = worker_pool(options)?;
    let element_type = plan.element_type();
    log::debug!(
        "compressing {} chunks of a {element_type} array with shape {} using {} workers ({mode})",
        plan.len(),
        plan.shape(),
        options.worker_count()
    );
    pool.install(|| {
        regions
            .into_par_iter()
            .map(|region| encode_chunk(&region, element_type, codec, mode))
            .collect::<Result<Vec<_>, _>>()
    })
}

/// Decompress every chunk of `plan` in parallel into `buffer`.
///
/// `artifacts` must hold one compressed artifact per chunk, in chunk index order.
/// Each chunk is decoded in place into its region of `buffer` by one task.
///
/// # Errors
/// Returns an [`ArrayError`] if
///  - the number of artifacts does not match the number of chunks ([`ArrayError::ArtifactCountMismatch`]),
///  - `plan` does not match the shape and element type of `buffer`,
///  - the worker count is zero or the worker pool cannot be started,
///  - an artifact is malformed ([`ArrayError::MalformedArtifact`]), or
///  - the codec fails to decode any block ([`ArrayError::ChunkCodecError`]).
///
/// `buffer` is untouched if any of the first three checks fail.
/// Otherwise, on error the contents of the regions of chunks that were not fully decoded are unspecified.
pub fn decompress_chunks<A: AsRef<[u8]> + Sync>(
    artifacts: &[A],
    buffer: &mut SharedBuffer,
    plan: &ChunkPlan,
    codec: &dyn BlockCodecTraits,
    options: &ParallelOptions,
) -> Result<(), ArrayError> {
    if artifacts.len() != plan.len() {
        return Err(ArrayError::ArtifactCountMismatch {
            got: artifacts.len(),
            expected: plan.len(),
        });
    }
    let pool = worker_pool(options)?;
    let element_type = plan.element_type();
    let regions = buffer.regions_mut(plan)?;
    log::debug!(
        "decompressing {} chunks of a {element_type} array with shape {} using {} workers",
        plan.len(),
        plan.shape(),
        options.worker_count()
    );
    pool.install(|| {
        regions
            .into_par_iter()
            .zip(artifacts.par_iter())
            .try_for_each(|(mut region, artifact)| {
                decode_chunk(&mut region, element_type, artifact.as_ref(), codec)
            })
    })
}
