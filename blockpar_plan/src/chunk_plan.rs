use std::ops::Range;

use itertools::Itertools;

use crate::{BlockGrid, BlockSubset, ElementType, PartitionPolicy, PlanError, Shape};

/// A chunk: a contiguous run of blocks in the row-major block enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Chunk {
    index: usize,
    blocks: Range<u64>,
}

impl Chunk {
    /// The index of the chunk in its [`ChunkPlan`].
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The linear block indices of the chunk.
    #[must_use]
    pub fn blocks(&self) -> Range<u64> {
        self.blocks.clone()
    }

    /// The number of blocks in the chunk.
    #[must_use]
    pub fn num_blocks(&self) -> u64 {
        self.blocks.end - self.blocks.start
    }
}

/// An ordered partition of a [`BlockGrid`] into chunks.
///
/// The chunks of a plan are non-empty, non-overlapping, and cover every block of the grid exactly once.
/// A plan can only be created by [`plan`] or [`ChunkPlan::from_block_splits`], both of which uphold these invariants.
/// The index of a chunk in the plan identifies the chunk everywhere else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkPlan {
    grid: BlockGrid,
    element_type: ElementType,
    chunks: Vec<Chunk>,
}

/// Compute the number of blocks per chunk for a partition policy.
///
/// The result is at least one.
///
/// # Errors
/// Returns a [`PlanError`] if the policy is invalid.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn blocks_per_chunk(
    grid: &BlockGrid,
    element_type: ElementType,
    policy: &PartitionPolicy,
) -> Result<u64, PlanError> {
    policy.validate()?;
    let num_blocks = grid.num_blocks();
    let blocks_per_chunk = match *policy {
        PartitionPolicy::CacheTarget {
            bytes_per_chunk,
            estimated_compression_ratio,
        } => {
            let dimensionality = i32::try_from(grid.shape().dimensionality())
                .map_err(|_| PlanError::InvalidDimensionality(grid.shape().dimensionality()))?;
            let compressed_bytes_per_block = 2f64.powi(dimensionality)
                * element_type.size() as f64
                / estimated_compression_ratio;
            // saturating
            (bytes_per_chunk as f64 / compressed_bytes_per_block).round() as u64
        }
        PartitionPolicy::EqualCount { parts } => {
            if parts > num_blocks {
                log::warn!(
                    "requested {parts} parts but the block grid only has {num_blocks} blocks, using one block per chunk"
                );
            }
            num_blocks.div_ceil(parts)
        }
    };
    Ok(blocks_per_chunk.max(1))
}

/// Plan the chunks of an array with `shape` and `element_type` with a partition `policy`.
///
/// Planning is pure: identical inputs produce identical plans.
///
/// # Errors
/// Returns a [`PlanError`] if the policy is invalid.
pub fn plan(
    shape: &Shape,
    element_type: ElementType,
    policy: &PartitionPolicy,
) -> Result<ChunkPlan, PlanError> {
    let grid = BlockGrid::new(shape.clone());
    let blocks_per_chunk = blocks_per_chunk(&grid, element_type, policy)?;
    let num_blocks = grid.num_blocks();
    let num_chunks = usize::try_from(num_blocks.div_ceil(blocks_per_chunk))
        .map_err(|_| PlanError::ShapeOverflow(shape.to_vec()))?;
    let chunks = (0..num_chunks)
        .map(|index| {
            let start = index as u64 * blocks_per_chunk;
            let end = std::cmp::min(start + blocks_per_chunk, num_blocks);
            Chunk {
                index,
                blocks: start..end,
            }
        })
        .collect::<Vec<_>>();
    log::debug!(
        "planned {num_chunks} chunks of up to {blocks_per_chunk} blocks for a {element_type} array with shape {shape} ({num_blocks} blocks)"
    );
    Ok(ChunkPlan {
        grid,
        element_type,
        chunks,
    })
}

/// Validate that `block_splits` partition the blocks of `grid`.
///
/// # Errors
/// Returns [`PlanError::InvalidBlockSplits`] unless the splits are non-empty `[start, end)` pairs that
/// start at block 0, are contiguous and non-empty, and end at the number of blocks in the grid.
pub fn validate_block_splits(grid: &BlockGrid, block_splits: &[Vec<u64>]) -> Result<(), PlanError> {
    chunks_from_block_splits(grid, block_splits).map(|_| ())
}

fn chunks_from_block_splits(
    grid: &BlockGrid,
    block_splits: &[Vec<u64>],
) -> Result<Vec<Chunk>, PlanError> {
    let invalid = |reason: String| Err(PlanError::InvalidBlockSplits(reason));
    let mut chunks = Vec::with_capacity(block_splits.len());
    for (index, split) in block_splits.iter().enumerate() {
        let &[start, end] = split.as_slice() else {
            return invalid(format!(
                "chunk {index} has {} boundaries, expected 2",
                split.len()
            ));
        };
        if start >= end {
            return invalid(format!("chunk {index} has no blocks ({start}..{end})"));
        }
        chunks.push(Chunk {
            index,
            blocks: start..end,
        });
    }

    match (chunks.first(), chunks.last()) {
        (Some(first), Some(last)) => {
            if first.blocks.start != 0 {
                return invalid(format!(
                    "the first chunk starts at block {}",
                    first.blocks.start
                ));
            }
            if last.blocks.end != grid.num_blocks() {
                return invalid(format!(
                    "the last chunk ends at block {}, expected {}",
                    last.blocks.end,
                    grid.num_blocks()
                ));
            }
        }
        _ => return invalid("there are no chunks".to_string()),
    }
    if let Some((previous, next)) = chunks
        .iter()
        .tuple_windows()
        .find(|(previous, next)| previous.blocks.end != next.blocks.start)
    {
        return invalid(format!(
            "chunk {} ends at block {} but chunk {} starts at block {}",
            previous.index, previous.blocks.end, next.index, next.blocks.start
        ));
    }
    Ok(chunks)
}

impl ChunkPlan {
    /// Create a chunk plan. See [`plan`].
    ///
    /// # Errors
    /// Returns a [`PlanError`] if the policy is invalid.
    pub fn new(
        shape: &Shape,
        element_type: ElementType,
        policy: &PartitionPolicy,
    ) -> Result<Self, PlanError> {
        plan(shape, element_type, policy)
    }

    /// Recreate a chunk plan from its block splits, as returned by [`ChunkPlan::block_splits`].
    ///
    /// # Errors
    /// Returns [`PlanError::InvalidBlockSplits`] if the block splits do not partition the grid, see [`validate_block_splits`].
    pub fn from_block_splits(
        grid: BlockGrid,
        element_type: ElementType,
        block_splits: &[Vec<u64>],
    ) -> Result<Self, PlanError> {
        let chunks = chunks_from_block_splits(&grid, block_splits)?;
        Ok(Self {
            grid,
            element_type,
            chunks,
        })
    }

    /// The block grid.
    #[must_use]
    pub fn grid(&self) -> &BlockGrid {
        &self.grid
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        self.grid.shape()
    }

    /// The element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The chunks, ordered by chunk index.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The chunk with index `chunk`, if it exists.
    #[must_use]
    pub fn chunk(&self, chunk: usize) -> Option<&Chunk> {
        self.chunks.get(chunk)
    }

    /// The number of chunks. This is always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true if the plan has no chunks, which is never the case for a valid plan.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The block splits of the plan: a `[start, end)` pair of linear block indices per chunk.
    #[must_use]
    pub fn block_splits(&self) -> Vec<Vec<u64>> {
        self.chunks
            .iter()
            .map(|chunk| vec![chunk.blocks.start, chunk.blocks.end])
            .collect()
    }

    /// The blocks of `chunk`, in block order.
    ///
    /// Returns [`None`] if `chunk` is out of bounds.
    pub fn chunk_block_subsets(
        &self,
        chunk: usize,
    ) -> Option<impl Iterator<Item = BlockSubset> + '_> {
        let chunk = self.chunks.get(chunk)?;
        Some(
            chunk
                .blocks()
                .filter_map(|block| self.grid.block_subset(block)),
        )
    }

    /// The contiguous runs of linearised element indices covered by `chunk`, in block order.
    ///
    /// This is the mapping from a chunk to its region of an array buffer.
    /// Returns [`None`] if `chunk` is out of bounds.
    pub fn chunk_linearised_ranges(
        &self,
        chunk: usize,
    ) -> Option<impl Iterator<Item = Range<u64>> + '_> {
        let shape = self.grid.shape();
        Some(
            self.chunk_block_subsets(chunk)?
                .flat_map(move |block| block.contiguous_linearised_ranges(shape)),
        )
    }

    /// The number of elements covered by `chunk`.
    ///
    /// Returns [`None`] if `chunk` is out of bounds.
    #[must_use]
    pub fn chunk_num_elements(&self, chunk: usize) -> Option<u64> {
        Some(
            self.chunk_block_subsets(chunk)?
                .map(|block| block.num_elements())
                .sum(),
        )
    }
}
