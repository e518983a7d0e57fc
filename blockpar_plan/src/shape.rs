use std::fmt::Display;
use std::ops::Range;

use derive_more::Deref;

use crate::PlanError;

/// The maximum dimensionality of an array.
pub const MAX_DIMENSIONALITY: usize = 4;

/// The edge length of a block along every dimension.
pub const BLOCK_EDGE: u64 = 4;

/// The shape of an array.
///
/// A shape has between 1 and [`MAX_DIMENSIONALITY`] dimensions, each with a nonzero extent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deref)]
pub struct Shape(Vec<u64>);

impl Shape {
    /// Create a new shape.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - the dimensionality is zero or exceeds [`MAX_DIMENSIONALITY`],
    ///  - any extent is zero, or
    ///  - the number of elements overflows [`u64`].
    pub fn new(dimensions: Vec<u64>) -> Result<Self, PlanError> {
        if dimensions.is_empty() || dimensions.len() > MAX_DIMENSIONALITY {
            return Err(PlanError::InvalidDimensionality(dimensions.len()));
        }
        if dimensions.contains(&0) {
            return Err(PlanError::ZeroExtent(dimensions));
        }
        if dimensions
            .iter()
            .try_fold(1u64, |acc, &extent| acc.checked_mul(extent))
            .is_none()
        {
            return Err(PlanError::ShapeOverflow(dimensions));
        }
        Ok(Self(dimensions))
    }

    /// The number of dimensions.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }

    /// The number of elements.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.0.iter().product()
    }

    /// The row-major (C order) element strides of the shape.
    #[must_use]
    pub fn strides(&self) -> Vec<u64> {
        let mut strides = vec![1; self.0.len()];
        for i in (0..self.0.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.0[i + 1];
        }
        strides
    }

    /// Return the extents as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

impl TryFrom<Vec<u64>> for Shape {
    type Error = PlanError;

    fn try_from(dimensions: Vec<u64>) -> Result<Self, Self::Error> {
        Self::new(dimensions)
    }
}

impl TryFrom<&[u64]> for Shape {
    type Error = PlanError;

    fn try_from(dimensions: &[u64]) -> Result<Self, Self::Error> {
        Self::new(dimensions.to_vec())
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// The grid of blocks covering an array.
///
/// Along each dimension there are `ceil(extent / 4)` blocks.
/// Blocks are enumerated in row-major order, so the last dimension varies fastest.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockGrid {
    shape: Shape,
    grid_shape: Vec<u64>,
}

impl BlockGrid {
    /// Create the block grid of an array with `shape`.
    #[must_use]
    pub fn new(shape: Shape) -> Self {
        let grid_shape = shape
            .iter()
            .map(|extent| extent.div_ceil(BLOCK_EDGE))
            .collect();
        Self { shape, grid_shape }
    }

    /// The shape of the array.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The number of blocks along each dimension.
    #[must_use]
    pub fn grid_shape(&self) -> &[u64] {
        &self.grid_shape
    }

    /// The total number of blocks.
    #[must_use]
    pub fn num_blocks(&self) -> u64 {
        self.grid_shape.iter().product()
    }

    /// The grid indices of the block with linear index `block`.
    ///
    /// Returns [`None`] if `block` is out of bounds.
    #[must_use]
    pub fn block_indices(&self, block: u64) -> Option<Vec<u64>> {
        if block >= self.num_blocks() {
            return None;
        }
        let mut indices = vec![0; self.grid_shape.len()];
        let mut remainder = block;
        for (index, extent) in indices.iter_mut().zip(&self.grid_shape).rev() {
            *index = remainder % extent;
            remainder /= extent;
        }
        Some(indices)
    }

    /// The region of the array covered by the block with linear index `block`.
    ///
    /// Blocks on the high edge of a dimension with an extent that is not a multiple of 4 are ragged.
    /// Returns [`None`] if `block` is out of bounds.
    #[must_use]
    pub fn block_subset(&self, block: u64) -> Option<BlockSubset> {
        let indices = self.block_indices(block)?;
        let (start, shape) = indices
            .iter()
            .zip(self.shape.iter())
            .map(|(&index, &extent)| {
                let start = index * BLOCK_EDGE;
                (start, std::cmp::min(BLOCK_EDGE, extent - start))
            })
            .unzip();
        Some(BlockSubset { start, shape })
    }
}

/// The region of an array covered by a single block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockSubset {
    start: Vec<u64>,
    shape: Vec<u64>,
}

impl BlockSubset {
    /// The start (inclusive) of the block in array element coordinates.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// The shape of the block. Each extent is between 1 and 4.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// The number of elements in the block.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Return an iterator over the contiguous runs of linearised element indices of the block within an array of `array_shape`.
    ///
    /// Runs are produced in the row-major order of the block, so concatenating the elements of each run yields the block in C order.
    #[must_use]
    pub fn contiguous_linearised_ranges(&self, array_shape: &Shape) -> ContiguousLinearisedRanges {
        ContiguousLinearisedRanges::new(self, array_shape)
    }
}

impl Display for BlockSubset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ranges: Vec<Range<u64>> = self
            .start
            .iter()
            .zip(&self.shape)
            .map(|(&start, &extent)| start..start + extent)
            .collect();
        write!(f, "{ranges:?}")
    }
}

/// An iterator over the contiguous runs of linearised element indices of a [`BlockSubset`].
///
/// See [`BlockSubset::contiguous_linearised_ranges`].
#[derive(Clone, Debug)]
pub struct ContiguousLinearisedRanges {
    start: Vec<u64>,
    outer_shape: Vec<u64>,
    strides: Vec<u64>,
    position: Vec<u64>,
    run: u64,
    remaining: u64,
}

impl ContiguousLinearisedRanges {
    fn new(subset: &BlockSubset, array_shape: &Shape) -> Self {
        let dimensionality = subset.shape.len();
        let outer_shape = subset.shape[..dimensionality - 1].to_vec();
        Self {
            start: subset.start.clone(),
            remaining: outer_shape.iter().product(),
            position: vec![0; outer_shape.len()],
            outer_shape,
            strides: array_shape.strides(),
            run: subset.shape[dimensionality - 1],
        }
    }
}

impl Iterator for ContiguousLinearisedRanges {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let last = self.start.len() - 1;
        let offset = self
            .position
            .iter()
            .zip(&self.start)
            .zip(&self.strides)
            .map(|((position, start), stride)| (start + position) * stride)
            .sum::<u64>()
            + self.start[last];

        // Advance the outer position (row-major)
        for (position, extent) in self.position.iter_mut().zip(&self.outer_shape).rev() {
            *position += 1;
            if *position < *extent {
                break;
            }
            *position = 0;
        }
        self.remaining -= 1;

        Some(offset..offset + self.run)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ContiguousLinearisedRanges {}
