use std::sync::Arc;

use blockpar_codec::{BlockCodecTraits, CodecMode, CodecParameters};
use blockpar_plan::{BlockGrid, ChunkPlan, ElementType, PartitionPolicy, Shape, plan};

use crate::{
    ArrayError, ParallelOptions, SharedBuffer, compress_chunks,
    config::global_config,
    decompress_chunks,
    layout::{CompressedFiles, LayoutHeader},
};

/// An uncompressed array held in a [`SharedBuffer`], together with its [`ChunkPlan`] and block codec.
///
/// Create a [`ChunkedArray`] with a [`ChunkedArrayBuilder`] or from a [`LayoutHeader`] with [`ChunkedArray::from_header`].
///
/// ### Example
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use blockpar::{ChunkedArrayBuilder, ElementType, ParallelOptions, codec::CodecMode};
///
/// let mut array = ChunkedArrayBuilder::new(vec![10, 20], ElementType::Float64)
///     .parts(3)
///     .build()?;
/// array
///     .buffer_mut()
///     .as_slice_mut::<f64>()?
///     .iter_mut()
///     .enumerate()
///     .for_each(|(i, v)| *v = i as f64 * 0.25);
///
/// let options = ParallelOptions::default().with_worker_count(2);
/// let artifacts = array.compress(&CodecMode::Tolerance(0.0), &options)?;
/// assert_eq!(artifacts.len(), 3);
///
/// let mut restored = ChunkedArrayBuilder::new(vec![10, 20], ElementType::Float64)
///     .parts(3)
///     .build()?;
/// restored.decompress(&artifacts, &options)?;
/// assert_eq!(restored.buffer().as_bytes(), array.buffer().as_bytes());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChunkedArray {
    buffer: SharedBuffer,
    plan: ChunkPlan,
    codec: Arc<dyn BlockCodecTraits>,
}

impl ChunkedArray {
    /// Create a chunked array with a zero-initialised buffer for `plan`.
    ///
    /// # Errors
    /// Returns [`ArrayError::BufferError`] if the buffer cannot be allocated.
    pub fn new(plan: ChunkPlan, codec: Arc<dyn BlockCodecTraits>) -> Result<Self, ArrayError> {
        let buffer = SharedBuffer::allocate(plan.shape().clone(), plan.element_type())?;
        Ok(Self {
            buffer,
            plan,
            codec,
        })
    }

    /// Create a chunked array with a zero-initialised buffer for the plan described by `header`.
    ///
    /// The block splits are validated against the header dimensions.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the header does not describe a valid plan,
    ///  - the header lists a different number of per-chunk artifact files than chunks, or
    ///  - the buffer cannot be allocated.
    pub fn from_header(
        header: &LayoutHeader,
        element_type: ElementType,
        codec: Arc<dyn BlockCodecTraits>,
    ) -> Result<Self, ArrayError> {
        let grid = BlockGrid::new(Shape::new(header.dimensions().to_vec())?);
        let plan = ChunkPlan::from_block_splits(grid, element_type, header.block_splits())?;
        if let CompressedFiles::PerChunk(files) = header.compressed_files()
            && files.len() != plan.len()
        {
            return Err(ArrayError::ArtifactCountMismatch {
                got: files.len(),
                expected: plan.len(),
            });
        }
        Self::new(plan, codec)
    }

    /// Return the buffer.
    #[must_use]
    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    /// Return a mutable reference to the buffer.
    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut SharedBuffer {
        &mut self.buffer
    }

    /// Consume the chunked array and return its buffer.
    #[must_use]
    pub fn into_buffer(self) -> SharedBuffer {
        self.buffer
    }

    /// Return the chunk plan.
    #[must_use]
    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// Return the block codec.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn BlockCodecTraits> {
        &self.codec
    }

    /// Compress every chunk in parallel with `mode`.
    ///
    /// See [`compress_chunks`].
    ///
    /// # Errors
    /// See [`compress_chunks`].
    pub fn compress(
        &self,
        mode: &CodecMode,
        options: &ParallelOptions,
    ) -> Result<Vec<Vec<u8>>, ArrayError> {
        compress_chunks(&self.buffer, &self.plan, self.codec.as_ref(), mode, options)
    }

    /// Compress every chunk in parallel with the codec mode selected by `parameters`.
    ///
    /// # Errors
    /// Returns [`ArrayError::CodecModeError`] before any work is dispatched if `parameters` do not select exactly one valid mode.
    /// Otherwise see [`compress_chunks`].
    pub fn compress_with_parameters(
        &self,
        parameters: &CodecParameters,
        options: &ParallelOptions,
    ) -> Result<Vec<Vec<u8>>, ArrayError> {
        let mode = CodecMode::try_from(parameters)?;
        self.compress(&mode, options)
    }

    /// Decompress `artifacts` in parallel into the buffer.
    ///
    /// See [`decompress_chunks`].
    ///
    /// # Errors
    /// See [`decompress_chunks`].
    pub fn decompress<A: AsRef<[u8]> + Sync>(
        &mut self,
        artifacts: &[A],
        options: &ParallelOptions,
    ) -> Result<(), ArrayError> {
        decompress_chunks(
            artifacts,
            &mut self.buffer,
            &self.plan,
            self.codec.as_ref(),
            options,
        )
    }

    /// Return the layout header of the array with its artifacts at `compressed_files`.
    #[must_use]
    pub fn layout_header(&self, compressed_files: CompressedFiles) -> LayoutHeader {
        LayoutHeader::from_plan(&self.plan, compressed_files)
    }
}

/// A [`ChunkedArray`] builder.
///
/// The builder is initialised with an array shape and element type.
/// Exactly one of [`bytes_per_chunk`](ChunkedArrayBuilder::bytes_per_chunk) or [`parts`](ChunkedArrayBuilder::parts) must be set before calling [`build`](ChunkedArrayBuilder::build).
///  - The default estimated compression ratio is the [global estimated compression ratio](crate::config::Config#estimated-compression-ratio).
///  - The default codec is the [`ZfpCodec`](crate::codec::ZfpCodec) with the `zfp` feature; otherwise a codec must be set.
#[derive(Debug, Clone)]
pub struct ChunkedArrayBuilder {
    shape: Vec<u64>,
    element_type: ElementType,
    bytes_per_chunk: Option<u64>,
    parts: Option<u64>,
    estimated_compression_ratio: Option<f64>,
    codec: Option<Arc<dyn BlockCodecTraits>>,
}

impl ChunkedArrayBuilder {
    /// Create a new chunked array builder for an array with `shape` and `element_type`.
    #[must_use]
    pub fn new(shape: Vec<u64>, element_type: ElementType) -> Self {
        Self {
            shape,
            element_type,
            bytes_per_chunk: None,
            parts: None,
            estimated_compression_ratio: None,
            codec: None,
        }
    }

    /// Size chunks to approximately `bytes_per_chunk` compressed bytes.
    pub fn bytes_per_chunk(&mut self, bytes_per_chunk: u64) -> &mut Self {
        self.bytes_per_chunk = Some(bytes_per_chunk);
        self
    }

    /// Divide the array into approximately `parts` chunks.
    pub fn parts(&mut self, parts: u64) -> &mut Self {
        self.parts = Some(parts);
        self
    }

    /// Set the estimated compression ratio used to size chunks with [`bytes_per_chunk`](ChunkedArrayBuilder::bytes_per_chunk).
    pub fn estimated_compression_ratio(&mut self, estimated_compression_ratio: f64) -> &mut Self {
        self.estimated_compression_ratio = Some(estimated_compression_ratio);
        self
    }

    /// Set the block codec.
    pub fn codec(&mut self, codec: Arc<dyn BlockCodecTraits>) -> &mut Self {
        self.codec = Some(codec);
        self
    }

    /// Return the partition policy selected by the builder.
    ///
    /// # Errors
    /// Returns a [`PlanError`](blockpar_plan::PlanError) if neither or both of the bytes per chunk and the number of parts are set, or the policy is invalid.
    pub fn partition_policy(&self) -> Result<PartitionPolicy, blockpar_plan::PlanError> {
        let estimated_compression_ratio = self
            .estimated_compression_ratio
            .unwrap_or_else(|| global_config().estimated_compression_ratio());
        PartitionPolicy::from_parameters(
            self.bytes_per_chunk,
            self.parts,
            estimated_compression_ratio,
        )
    }

    fn block_codec(&self) -> Result<Arc<dyn BlockCodecTraits>, ArrayError> {
        match &self.codec {
            Some(codec) => Ok(codec.clone()),
            #[cfg(feature = "zfp")]
            None => Ok(Arc::new(crate::codec::ZfpCodec::new())),
            #[cfg(not(feature = "zfp"))]
            None => Err(ArrayError::MissingCodec),
        }
    }

    /// Build into a [`ChunkedArray`] with a zero-initialised buffer.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the shape or partition policy is invalid, no codec is available, or the buffer cannot be allocated.
    pub fn build(&self) -> Result<ChunkedArray, ArrayError> {
        let policy = self.partition_policy()?;
        let shape = Shape::new(self.shape.clone())?;
        let plan = plan(&shape, self.element_type, &policy)?;
        ChunkedArray::new(plan, self.block_codec()?)
    }
}

#[cfg(test)]
mod tests {
    use blockpar_plan::PlanError;

    use super::*;

    #[cfg(feature = "zfp")]
    #[test]
    fn chunked_array_builder() {
        let array = ChunkedArrayBuilder::new(vec![10], ElementType::Int32)
            .parts(3)
            .build()
            .unwrap();
        assert_eq!(array.plan().block_splits(), vec![vec![0, 1], vec![1, 2], vec![2, 3]]);
        assert_eq!(array.buffer().size(), 40);
        assert!(array.buffer().as_bytes().iter().all(|&b| b == 0));

        let array = ChunkedArrayBuilder::new(vec![16, 20], ElementType::Float64)
            .bytes_per_chunk(64)
            .estimated_compression_ratio(4.0)
            .build()
            .unwrap();
        assert_eq!(array.plan().len(), 3);
    }

    #[test]
    fn chunked_array_builder_invalid() {
        let mut builder = ChunkedArrayBuilder::new(vec![10], ElementType::Int32);
        assert!(matches!(
            builder.build(),
            Err(ArrayError::PlanError(PlanError::AmbiguousPartitionPolicy))
        ));
        builder.parts(2).bytes_per_chunk(100);
        assert!(matches!(
            builder.build(),
            Err(ArrayError::PlanError(PlanError::AmbiguousPartitionPolicy))
        ));
        assert!(matches!(
            ChunkedArrayBuilder::new(vec![], ElementType::Int32)
                .parts(1)
                .build(),
            Err(ArrayError::PlanError(PlanError::InvalidDimensionality(0)))
        ));
        assert!(matches!(
            ChunkedArrayBuilder::new(vec![4], ElementType::Int32)
                .parts(0)
                .build(),
            Err(ArrayError::PlanError(PlanError::InvalidPartCount))
        ));
    }

    #[cfg(not(feature = "zfp"))]
    #[test]
    fn chunked_array_builder_missing_codec() {
        assert!(matches!(
            ChunkedArrayBuilder::new(vec![10], ElementType::Int32)
                .parts(3)
                .build(),
            Err(ArrayError::MissingCodec)
        ));
    }

    #[cfg(feature = "zfp")]
    #[test]
    fn chunked_array_header() {
        let array = ChunkedArrayBuilder::new(vec![9, 9], ElementType::Float32)
            .parts(2)
            .build()
            .unwrap();
        let header = array.layout_header(CompressedFiles::PerChunk(vec![
            "a.0.bpc".to_string(),
            "a.1.bpc".to_string(),
        ]));
        assert_eq!(header.dimensions(), &[9, 9]);
        assert_eq!(header.block_splits(), &[vec![0, 5], vec![5, 9]]);

        let restored =
            ChunkedArray::from_header(&header, ElementType::Float32, array.codec().clone())
                .unwrap();
        assert_eq!(restored.plan(), array.plan());

        let header = LayoutHeader::new(
            vec![9, 9],
            vec![vec![0, 5], vec![5, 9]],
            CompressedFiles::PerChunk(vec!["a.0.bpc".to_string()]),
        );
        assert!(matches!(
            ChunkedArray::from_header(&header, ElementType::Float32, array.codec().clone()),
            Err(ArrayError::ArtifactCountMismatch {
                got: 1,
                expected: 2
            })
        ));
    }
}
