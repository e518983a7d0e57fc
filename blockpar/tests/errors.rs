#![allow(missing_docs)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use blockpar::{
    ArrayError, BufferError, ChunkedArrayBuilder, ElementType, ParallelOptions, PartitionPolicy,
    Shape, SharedBuffer,
    codec::{
        BlockCodecTraits, BlockRepresentation, CodecError, CodecMode, CodecModeError,
        CodecParameters,
    },
    compress_chunks, decompress_chunks, plan,
};

/// Stores blocks verbatim, failing on any block containing `poison`.
#[derive(Debug)]
struct PoisonCodec {
    poison: i32,
    calls: AtomicUsize,
}

impl PoisonCodec {
    fn new(poison: i32) -> Self {
        Self {
            poison,
            calls: AtomicUsize::new(0),
        }
    }
}

impl BlockCodecTraits for PoisonCodec {
    fn encode_block(
        &self,
        decoded: &[u8],
        representation: &BlockRepresentation,
        _mode: &CodecMode,
    ) -> Result<Vec<u8>, CodecError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        CodecError::check_block_size(decoded.len(), representation)?;
        let values: Vec<i32> = bytemuck::pod_collect_to_vec(decoded);
        if values.contains(&self.poison) {
            return Err(CodecError::Other("poisoned block".to_string()));
        }
        Ok(decoded.to_vec())
    }

    fn decode_block(
        &self,
        encoded: &[u8],
        representation: &BlockRepresentation,
        decoded: &mut [u8],
    ) -> Result<(), CodecError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        CodecError::check_block_size(encoded.len(), representation)?;
        let values: Vec<i32> = bytemuck::pod_collect_to_vec(encoded);
        if values.contains(&self.poison) {
            return Err(CodecError::Other("poisoned block".to_string()));
        }
        decoded.copy_from_slice(encoded);
        Ok(())
    }
}

fn sevens(shape: &Shape) -> SharedBuffer {
    let n = usize::try_from(shape.num_elements()).unwrap();
    SharedBuffer::from_elements(shape.clone(), &vec![7i32; n]).unwrap()
}

#[test]
fn error_ambiguous_codec_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let codec = Arc::new(PoisonCodec::new(-1));
    let array = ChunkedArrayBuilder::new(vec![10], ElementType::Int32)
        .parts(3)
        .codec(codec.clone())
        .build()?;
    let options = ParallelOptions::default();

    let parameters = CodecParameters::default().with_tolerance(0.1).with_rate(8.0);
    assert!(matches!(
        array.compress_with_parameters(&parameters, &options),
        Err(ArrayError::CodecModeError(CodecModeError::Ambiguous))
    ));
    assert!(matches!(
        array.compress_with_parameters(&CodecParameters::default(), &options),
        Err(ArrayError::CodecModeError(CodecModeError::Missing))
    ));
    assert!(matches!(
        array.compress(&CodecMode::FixedRate(f64::NAN), &options),
        Err(ArrayError::CodecModeError(CodecModeError::InvalidRate(_)))
    ));
    // nothing was dispatched
    assert_eq!(codec.calls.load(Ordering::Relaxed), 0);

    let parameters = CodecParameters::default().with_precision(16);
    assert_eq!(array.compress_with_parameters(&parameters, &options)?.len(), 3);
    assert_eq!(codec.calls.load(Ordering::Relaxed), 3);
    Ok(())
}

#[test]
fn error_artifact_count_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![10])?;
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(3))?;
    let codec = PoisonCodec::new(-1);
    let options = ParallelOptions::default().with_worker_count(2);

    let source = SharedBuffer::from_elements(shape.clone(), &(0..10).collect::<Vec<i32>>())?;
    let mode = CodecMode::Tolerance(0.0);
    let artifacts = compress_chunks(&source, &chunk_plan, &codec, &mode, &options)?;
    assert_eq!(artifacts.len(), 3);

    let mut buffer = sevens(&shape);
    let result = decompress_chunks(&artifacts[..2], &mut buffer, &chunk_plan, &codec, &options);
    assert!(matches!(
        result,
        Err(ArrayError::ArtifactCountMismatch {
            got: 2,
            expected: 3
        })
    ));
    assert_eq!(buffer.as_slice::<i32>()?, &[7; 10]);
    Ok(())
}

#[test]
fn error_chunk_codec_error_reports_chunk() -> Result<(), Box<dyn std::error::Error>> {
    // 16 elements are 4 one-block chunks
    let shape = Shape::new(vec![16])?;
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(4))?;
    let codec = PoisonCodec::new(-1);
    let options = ParallelOptions::default().with_worker_count(4);

    let mut buffer = sevens(&shape);
    buffer.as_slice_mut::<i32>()?[9] = -1;
    let mode = CodecMode::FixedPrecision(8);
    let result = compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options);
    match result {
        Err(ArrayError::ChunkCodecError { chunk, source }) => {
            assert_eq!(chunk, 2);
            assert!(matches!(source, CodecError::Other(_)));
        }
        other => panic!("expected a chunk codec error, got {other:?}"),
    }

    // decoding fails in chunk 3
    let mut artifacts = compress_chunks(&sevens(&shape), &chunk_plan, &codec, &mode, &options)?;
    let poisoned = (-1i32).to_le_bytes();
    let len = artifacts[3].len();
    artifacts[3][len - 4..].copy_from_slice(&poisoned);
    let result = decompress_chunks(&artifacts, &mut buffer, &chunk_plan, &codec, &options);
    assert!(matches!(
        result,
        Err(ArrayError::ChunkCodecError { chunk: 3, .. })
    ));
    Ok(())
}

#[test]
fn error_malformed_artifact() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![8, 8])?;
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(2))?;
    let codec = PoisonCodec::new(-1);
    let options = ParallelOptions::default().with_worker_count(2);
    let mode = CodecMode::Tolerance(0.0);
    let buffer = sevens(&shape);
    let artifacts = compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options)?;

    let mut restored = SharedBuffer::allocate(shape.clone(), ElementType::Int32)?;
    let mut truncated = artifacts.clone();
    truncated[1].pop();
    assert!(matches!(
        decompress_chunks(&truncated, &mut restored, &chunk_plan, &codec, &options),
        Err(ArrayError::MalformedArtifact { chunk: 1, .. })
    ));

    let mut trailing = artifacts.clone();
    trailing[0].push(0);
    assert!(matches!(
        decompress_chunks(&trailing, &mut restored, &chunk_plan, &codec, &options),
        Err(ArrayError::MalformedArtifact { chunk: 0, .. })
    ));

    // artifacts are not interchangeable between chunks with different block counts
    let chunk_plan_4 = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(4))?;
    let artifacts_4 = compress_chunks(&buffer, &chunk_plan_4, &codec, &mode, &options)?;
    let swapped = vec![artifacts[0].clone(), artifacts_4[1].clone()];
    assert!(matches!(
        decompress_chunks(&swapped, &mut restored, &chunk_plan, &codec, &options),
        Err(ArrayError::MalformedArtifact { chunk: 1, .. })
    ));
    Ok(())
}

#[test]
fn error_invalid_worker_count() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![12])?;
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(3))?;
    let codec = PoisonCodec::new(-1);
    let options = ParallelOptions::default().with_worker_count(0);
    let mut buffer = sevens(&shape);

    let mode = CodecMode::FixedPrecision(8);
    assert!(matches!(
        compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options),
        Err(ArrayError::InvalidWorkerCount)
    ));
    let artifacts = vec![Vec::<u8>::new(); 3];
    assert!(matches!(
        decompress_chunks(&artifacts, &mut buffer, &chunk_plan, &codec, &options),
        Err(ArrayError::InvalidWorkerCount)
    ));
    assert_eq!(codec.calls.load(Ordering::Relaxed), 0);
    assert_eq!(buffer.as_slice::<i32>()?, &[7; 12]);
    Ok(())
}

#[test]
fn error_plan_buffer_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let codec = PoisonCodec::new(-1);
    let options = ParallelOptions::default();
    let mode = CodecMode::Tolerance(0.0);
    let buffer = sevens(&Shape::new(vec![12])?);

    let policy = PartitionPolicy::equal_count(3);
    let chunk_plan = plan(&Shape::new(vec![13])?, ElementType::Int32, &policy)?;
    assert!(matches!(
        compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options),
        Err(ArrayError::BufferError(BufferError::PlanMismatch { .. }))
    ));

    let chunk_plan = plan(&Shape::new(vec![12])?, ElementType::Float32, &policy)?;
    assert!(matches!(
        compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options),
        Err(ArrayError::BufferError(BufferError::PlanMismatch { .. }))
    ));
    assert_eq!(codec.calls.load(Ordering::Relaxed), 0);
    Ok(())
}

#[test]
fn error_buffer_element_type() -> Result<(), Box<dyn std::error::Error>> {
    let buffer = sevens(&Shape::new(vec![4, 4])?);
    assert!(matches!(
        buffer.as_slice::<f32>(),
        Err(BufferError::ElementTypeMismatch {
            got: ElementType::Float32,
            expected: ElementType::Int32
        })
    ));
    Ok(())
}

#[test]
fn error_buffer_allocation() -> Result<(), Box<dyn std::error::Error>> {
    // the size overflows u64
    assert!(matches!(
        SharedBuffer::allocate(Shape::new(vec![u64::MAX / 4])?, ElementType::Int64),
        Err(BufferError::Allocation { size: u64::MAX })
    ));
    // the size fits, the allocation does not
    let shape = Shape::new(vec![1 << 30, 1 << 28])?;
    assert!(matches!(
        SharedBuffer::allocate(shape, ElementType::Float64),
        Err(BufferError::Allocation { size }) if size == 1 << 61
    ));
    assert!(matches!(
        ChunkedArrayBuilder::new(vec![u64::MAX / 4], ElementType::Int64)
            .parts(1)
            .codec(Arc::new(PoisonCodec::new(-1)))
            .build(),
        Err(ArrayError::BufferError(BufferError::Allocation { .. }))
    ));
    Ok(())
}
