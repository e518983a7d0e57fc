use blockpar_codec::{CodecError, CodecModeError};
use blockpar_plan::{ElementType, PlanError};
use thiserror::Error;

/// A shared buffer error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum BufferError {
    /// The buffer could not be allocated.
    #[error("failed to allocate a shared buffer of {size} bytes")]
    Allocation {
        /// The requested size in bytes.
        size: u64,
    },
    /// The element type does not match the buffer.
    #[error("the element type {got} does not match the buffer element type {expected}")]
    ElementTypeMismatch {
        /// The requested element type.
        got: ElementType,
        /// The buffer element type.
        expected: ElementType,
    },
    /// Input bytes or elements with the wrong size.
    #[error("got {got} bytes, expected {expected}")]
    InvalidSize {
        /// The size in bytes.
        got: usize,
        /// The expected size in bytes.
        expected: usize,
    },
    /// An `ndarray` view of the buffer could not be created.
    #[error("failed to create an ndarray view of the buffer: {0}")]
    InvalidView(String),
    /// The chunk plan was not created for the buffer shape and element type.
    #[error(
        "the chunk plan is for a {plan_element_type} array with shape {plan_shape:?}, but the buffer is a {buffer_element_type} array with shape {buffer_shape:?}"
    )]
    PlanMismatch {
        /// The shape of the plan.
        plan_shape: Vec<u64>,
        /// The element type of the plan.
        plan_element_type: ElementType,
        /// The shape of the buffer.
        buffer_shape: Vec<u64>,
        /// The element type of the buffer.
        buffer_element_type: ElementType,
    },
    /// A chunk index that is not in the plan.
    #[error("chunk {chunk} is out of bounds for a plan with {num_chunks} chunks")]
    InvalidChunk {
        /// The chunk index.
        chunk: usize,
        /// The number of chunks in the plan.
        num_chunks: usize,
    },
    /// A block that is not in the region of a chunk.
    #[error("block {block} is not in chunk {chunk}")]
    BlockOutsideRegion {
        /// The linear block index.
        block: u64,
        /// The chunk index.
        chunk: usize,
    },
}

/// Array compression and decompression errors.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ArrayError {
    /// A planning error.
    #[error(transparent)]
    PlanError(#[from] PlanError),
    /// An invalid codec mode.
    #[error(transparent)]
    CodecModeError(#[from] CodecModeError),
    /// A shared buffer error.
    #[error(transparent)]
    BufferError(#[from] BufferError),
    /// A codec error in a chunk.
    #[error("chunk {chunk}: {source}")]
    ChunkCodecError {
        /// The chunk index.
        chunk: usize,
        /// The codec error.
        source: CodecError,
    },
    /// The number of artifacts does not match the number of chunks.
    #[error("got {got} compressed artifacts, expected {expected} (one per chunk)")]
    ArtifactCountMismatch {
        /// The number of artifacts.
        got: usize,
        /// The number of chunks.
        expected: usize,
    },
    /// A compressed artifact does not have a valid framing for its chunk.
    #[error("the compressed artifact of chunk {chunk} is malformed: {reason}")]
    MalformedArtifact {
        /// The chunk index.
        chunk: usize,
        /// The reason.
        reason: String,
    },
    /// A worker count of zero.
    #[error("the worker count must be greater than zero")]
    InvalidWorkerCount,
    /// No block codec was set and the `zfp` feature is disabled.
    #[error("no block codec was set")]
    MissingCodec,
    /// The worker pool could not be started.
    #[error("failed to start the worker pool: {0}")]
    WorkerPoolError(String),
}
