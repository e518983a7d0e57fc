//! The shared array buffer and its disjoint chunk regions.

use std::ops::Range;

use blockpar_plan::{BlockSubset, ChunkPlan, ElementType, Shape};
use unsafe_cell_slice::UnsafeCellSlice;

use crate::{BufferError, Element};

/// A contiguous, zero-initialised buffer holding an entire uncompressed array in row-major order.
///
/// The buffer is exclusively owned and its memory is released when it is dropped.
/// Workers access it through [`ChunkRegion`] and [`ChunkRegionMut`] handles, each scoped to the region of one chunk of a [`ChunkPlan`].
pub struct SharedBuffer {
    shape: Shape,
    element_type: ElementType,
    // u64 storage is aligned for every element type
    storage: Vec<u64>,
    size: usize,
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("shape", &self.shape)
            .field("element_type", &self.element_type)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl SharedBuffer {
    /// Allocate a zero-initialised buffer for an array with `shape` and `element_type`.
    ///
    /// # Errors
    /// Returns [`BufferError::Allocation`] if the buffer size overflows or the allocation fails.
    pub fn allocate(shape: Shape, element_type: ElementType) -> Result<Self, BufferError> {
        let size_u64 = shape
            .num_elements()
            .checked_mul(element_type.size() as u64)
            .ok_or(BufferError::Allocation { size: u64::MAX })?;
        let size =
            usize::try_from(size_u64).map_err(|_| BufferError::Allocation { size: size_u64 })?;
        let words = size.div_ceil(size_of::<u64>());
        let mut storage = Vec::new();
        storage
            .try_reserve_exact(words)
            .map_err(|_| BufferError::Allocation { size: size_u64 })?;
        storage.resize(words, 0);
        log::trace!(
            "allocated a {size} byte shared buffer for a {element_type} array with shape {shape}"
        );
        Ok(Self {
            shape,
            element_type,
            storage,
            size,
        })
    }

    /// Create a buffer holding a copy of `elements`, in row-major order.
    ///
    /// # Errors
    /// Returns a [`BufferError`] if the number of elements does not match `shape` or the allocation fails.
    pub fn from_elements<T: Element>(shape: Shape, elements: &[T]) -> Result<Self, BufferError> {
        let mut buffer = Self::allocate(shape, T::ELEMENT_TYPE)?;
        let destination = buffer.as_slice_mut::<T>()?;
        if destination.len() != elements.len() {
            return Err(BufferError::InvalidSize {
                got: size_of_val(elements),
                expected: size_of_val(destination),
            });
        }
        destination.copy_from_slice(elements);
        Ok(buffer)
    }

    /// Overwrite the buffer with native-endian element `bytes` in row-major order.
    ///
    /// # Errors
    /// Returns [`BufferError::InvalidSize`] if the length of `bytes` does not match the buffer size.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        if bytes.len() != self.size {
            return Err(BufferError::InvalidSize {
                got: bytes.len(),
                expected: self.size,
            });
        }
        self.as_bytes_mut().copy_from_slice(bytes);
        Ok(())
    }

    /// The array shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The element type.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The size of the buffer in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The native-endian element bytes of the buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.storage)[..self.size]
    }

    /// The mutable native-endian element bytes of the buffer.
    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.storage)[..self.size]
    }

    fn check_element_type<T: Element>(&self) -> Result<(), BufferError> {
        if T::ELEMENT_TYPE == self.element_type {
            Ok(())
        } else {
            Err(BufferError::ElementTypeMismatch {
                got: T::ELEMENT_TYPE,
                expected: self.element_type,
            })
        }
    }

    /// The elements of the buffer.
    ///
    /// # Errors
    /// Returns [`BufferError::ElementTypeMismatch`] if `T` does not match the buffer element type.
    pub fn as_slice<T: Element>(&self) -> Result<&[T], BufferError> {
        self.check_element_type::<T>()?;
        Ok(bytemuck::cast_slice(self.as_bytes()))
    }

    /// The mutable elements of the buffer.
    ///
    /// # Errors
    /// Returns [`BufferError::ElementTypeMismatch`] if `T` does not match the buffer element type.
    pub fn as_slice_mut<T: Element>(&mut self) -> Result<&mut [T], BufferError> {
        self.check_element_type::<T>()?;
        Ok(bytemuck::cast_slice_mut(self.as_bytes_mut()))
    }

    #[cfg(feature = "ndarray")]
    #[allow(clippy::cast_possible_truncation)]
    fn shape_usize(&self) -> Vec<usize> {
        // the buffer size fits in usize, so does every extent
        self.shape.iter().map(|&extent| extent as usize).collect()
    }

    #[cfg(feature = "ndarray")]
    /// A typed multidimensional view of the buffer.
    ///
    /// # Errors
    /// Returns [`BufferError::ElementTypeMismatch`] if `T` does not match the buffer element type.
    /// [`BufferError::InvalidView`] is not expected, the buffer always holds exactly the elements of its shape.
    pub fn as_ndarray<T: Element>(&self) -> Result<ndarray::ArrayViewD<'_, T>, BufferError> {
        let shape = self.shape_usize();
        let elements = self.as_slice::<T>()?;
        ndarray::ArrayViewD::from_shape(shape, elements)
            .map_err(|err| BufferError::InvalidView(err.to_string()))
    }

    #[cfg(feature = "ndarray")]
    /// A mutable typed multidimensional view of the buffer.
    ///
    /// # Errors
    /// Returns [`BufferError::ElementTypeMismatch`] if `T` does not match the buffer element type.
    /// [`BufferError::InvalidView`] is not expected, the buffer always holds exactly the elements of its shape.
    pub fn as_ndarray_mut<T: Element>(
        &mut self,
    ) -> Result<ndarray::ArrayViewMutD<'_, T>, BufferError> {
        let shape = self.shape_usize();
        let elements = self.as_slice_mut::<T>()?;
        ndarray::ArrayViewMutD::from_shape(shape, elements)
            .map_err(|err| BufferError::InvalidView(err.to_string()))
    }

    /// Check that `plan` was created for the shape and element type of the buffer.
    ///
    /// # Errors
    /// Returns [`BufferError::PlanMismatch`] otherwise.
    pub fn check_plan(&self, plan: &ChunkPlan) -> Result<(), BufferError> {
        if plan.shape() == &self.shape && plan.element_type() == self.element_type {
            Ok(())
        } else {
            Err(BufferError::PlanMismatch {
                plan_shape: plan.shape().to_vec(),
                plan_element_type: plan.element_type(),
                buffer_shape: self.shape.to_vec(),
                buffer_element_type: self.element_type,
            })
        }
    }

    fn check_chunk(plan: &ChunkPlan, chunk: usize) -> Result<(), BufferError> {
        if chunk < plan.len() {
            Ok(())
        } else {
            Err(BufferError::InvalidChunk {
                chunk,
                num_chunks: plan.len(),
            })
        }
    }

    /// The read-only region of `chunk`.
    ///
    /// # Errors
    /// Returns a [`BufferError`] if the plan does not match the buffer or `chunk` is out of bounds.
    pub fn region<'a>(
        &'a self,
        plan: &'a ChunkPlan,
        chunk: usize,
    ) -> Result<ChunkRegion<'a>, BufferError> {
        self.check_plan(plan)?;
        Self::check_chunk(plan, chunk)?;
        Ok(ChunkRegion {
            bytes: self.as_bytes(),
            plan,
            chunk,
        })
    }

    /// The read-only regions of every chunk in `plan`, ordered by chunk index.
    ///
    /// # Errors
    /// Returns [`BufferError::PlanMismatch`] if the plan does not match the buffer.
    pub fn regions<'a>(&'a self, plan: &'a ChunkPlan) -> Result<Vec<ChunkRegion<'a>>, BufferError> {
        self.check_plan(plan)?;
        let bytes = self.as_bytes();
        Ok((0..plan.len())
            .map(|chunk| ChunkRegion { bytes, plan, chunk })
            .collect())
    }

    /// The mutable region of `chunk`.
    ///
    /// # Errors
    /// Returns a [`BufferError`] if the plan does not match the buffer or `chunk` is out of bounds.
    pub fn region_mut<'a>(
        &'a mut self,
        plan: &'a ChunkPlan,
        chunk: usize,
    ) -> Result<ChunkRegionMut<'a>, BufferError> {
        self.check_plan(plan)?;
        Self::check_chunk(plan, chunk)?;
        Ok(ChunkRegionMut {
            bytes: UnsafeCellSlice::new(self.as_bytes_mut()),
            plan,
            chunk,
        })
    }

    /// The mutable regions of every chunk in `plan`, ordered by chunk index.
    ///
    /// The handles can be used concurrently from different threads.
    ///
    /// # Errors
    /// Returns [`BufferError::PlanMismatch`] if the plan does not match the buffer.
    pub fn regions_mut<'a>(
        &'a mut self,
        plan: &'a ChunkPlan,
    ) -> Result<Vec<ChunkRegionMut<'a>>, BufferError> {
        self.check_plan(plan)?;
        // The chunks of a plan cover disjoint blocks and each handle only writes to the blocks of its chunk.
        // The exclusive borrow of the buffer outlives every handle.
        let bytes = UnsafeCellSlice::new(self.as_bytes_mut());
        Ok((0..plan.len())
            .map(|chunk| ChunkRegionMut { bytes, plan, chunk })
            .collect())
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_byte_range(range: Range<u64>, element_size: usize) -> Range<usize> {
    // element indices are within the buffer, which fits in usize
    range.start as usize * element_size..range.end as usize * element_size
}

fn check_block(plan: &ChunkPlan, chunk: usize, block: u64) -> Result<BlockSubset, BufferError> {
    plan.chunk(chunk)
        .filter(|c| c.blocks().contains(&block))
        .and_then(|_| plan.grid().block_subset(block))
        .ok_or(BufferError::BlockOutsideRegion { block, chunk })
}

/// A read-only handle to the region of one chunk of a [`SharedBuffer`].
#[derive(Clone, Copy)]
pub struct ChunkRegion<'a> {
    bytes: &'a [u8],
    plan: &'a ChunkPlan,
    chunk: usize,
}

impl ChunkRegion<'_> {
    /// The chunk index.
    #[must_use]
    pub const fn chunk(&self) -> usize {
        self.chunk
    }

    /// The linear indices of the blocks in the region.
    #[must_use]
    pub fn blocks(&self) -> Range<u64> {
        self.plan
            .chunk(self.chunk)
            .map_or(0..0, blockpar_plan::Chunk::blocks)
    }

    /// The contiguous byte ranges of the region in the buffer, in block order.
    pub fn byte_ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let element_size = self.plan.element_type().size();
        self.plan
            .chunk_linearised_ranges(self.chunk)
            .into_iter()
            .flatten()
            .map(move |range| to_byte_range(range, element_size))
    }

    /// The size of the region in bytes.
    #[must_use]
    pub fn num_bytes(&self) -> usize {
        self.byte_ranges().map(|range| range.len()).sum()
    }

    /// Gather the row-major bytes of `block` into `out`, replacing its contents.
    ///
    /// Returns the subset of the array covered by the block.
    ///
    /// # Errors
    /// Returns [`BufferError::BlockOutsideRegion`] if `block` is not in the region.
    pub fn read_block(&self, block: u64, out: &mut Vec<u8>) -> Result<BlockSubset, BufferError> {
        let subset = check_block(self.plan, self.chunk, block)?;
        let element_size = self.plan.element_type().size();
        out.clear();
        for range in subset.contiguous_linearised_ranges(self.plan.shape()) {
            out.extend_from_slice(&self.bytes[to_byte_range(range, element_size)]);
        }
        Ok(subset)
    }

    /// Gather the bytes of the region, in block order.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.num_bytes());
        for range in self.byte_ranges() {
            bytes.extend_from_slice(&self.bytes[range]);
        }
        bytes
    }
}

/// A mutable handle to the region of one chunk of a [`SharedBuffer`].
///
/// Handles for different chunks of the same plan can be used concurrently.
pub struct ChunkRegionMut<'a> {
    bytes: UnsafeCellSlice<'a, u8>,
    plan: &'a ChunkPlan,
    chunk: usize,
}

impl std::fmt::Debug for ChunkRegion<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRegion")
            .field("chunk", &self.chunk)
            .field("blocks", &self.blocks())
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ChunkRegionMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRegionMut")
            .field("chunk", &self.chunk)
            .field("blocks", &self.blocks())
            .finish_non_exhaustive()
    }
}

impl ChunkRegionMut<'_> {
    /// The chunk index.
    #[must_use]
    pub const fn chunk(&self) -> usize {
        self.chunk
    }

    /// The linear indices of the blocks in the region.
    #[must_use]
    pub fn blocks(&self) -> Range<u64> {
        self.plan
            .chunk(self.chunk)
            .map_or(0..0, blockpar_plan::Chunk::blocks)
    }

    /// The size of the region in bytes.
    #[must_use]
    pub fn num_bytes(&self) -> usize {
        let element_size = self.plan.element_type().size();
        self.plan
            .chunk_num_elements(self.chunk)
            .map_or(0, |num_elements| {
                to_byte_range(0..num_elements, element_size).len()
            })
    }

    /// The subset of the array covered by `block`.
    ///
    /// # Errors
    /// Returns [`BufferError::BlockOutsideRegion`] if `block` is not in the region.
    pub fn block_subset(&self, block: u64) -> Result<BlockSubset, BufferError> {
        check_block(self.plan, self.chunk, block)
    }

    /// Scatter the row-major `bytes` of `block` into the buffer.
    ///
    /// Returns the subset of the array covered by the block.
    ///
    /// # Errors
    /// Returns a [`BufferError`] if `block` is not in the region or `bytes` is not the size of the block.
    pub fn write_block(&mut self, block: u64, bytes: &[u8]) -> Result<BlockSubset, BufferError> {
        let subset = check_block(self.plan, self.chunk, block)?;
        let element_size = self.plan.element_type().size();
        let expected = to_byte_range(0..subset.num_elements(), element_size).len();
        if bytes.len() != expected {
            return Err(BufferError::InvalidSize {
                got: bytes.len(),
                expected,
            });
        }
        let mut offset = 0;
        for range in subset.contiguous_linearised_ranges(self.plan.shape()) {
            let byte_range = to_byte_range(range, element_size);
            let len = byte_range.len();
            unsafe {
                // SAFETY: chunks represent disjoint array subsets and the block is in this chunk
                self.bytes
                    .index_mut(byte_range)
                    .copy_from_slice(&bytes[offset..offset + len]);
            }
            offset += len;
        }
        Ok(subset)
    }
}
