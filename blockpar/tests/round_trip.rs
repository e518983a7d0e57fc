#![allow(missing_docs)]
#![cfg(feature = "zfp")]

use blockpar::{
    ChunkPlan, ElementType, ParallelOptions, PartitionPolicy, Shape, SharedBuffer,
    codec::{CodecMode, ZfpCodec},
    compress_chunks, decompress_chunks, plan,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SHAPES: [&[u64]; 5] = [&[37], &[9, 13], &[5, 1, 7], &[8, 12, 4], &[3, 6, 5, 9]];

fn random_buffer(shape: &Shape, element_type: ElementType, rng: &mut StdRng) -> SharedBuffer {
    let n = usize::try_from(shape.num_elements()).unwrap();
    match element_type {
        ElementType::Float32 => {
            let elements: Vec<f32> = (0..n).map(|_| rng.random_range(-100.0..100.0)).collect();
            SharedBuffer::from_elements(shape.clone(), &elements)
        }
        ElementType::Float64 => {
            let elements: Vec<f64> = (0..n).map(|_| rng.random_range(-1e6..1e6)).collect();
            SharedBuffer::from_elements(shape.clone(), &elements)
        }
        ElementType::Int32 => {
            let elements: Vec<i32> = (0..n)
                .map(|_| rng.random_range(-(1 << 29)..1 << 29))
                .collect();
            SharedBuffer::from_elements(shape.clone(), &elements)
        }
        ElementType::Int64 => {
            let elements: Vec<i64> = (0..n)
                .map(|_| rng.random_range(-(1 << 61)..1 << 61))
                .collect();
            SharedBuffer::from_elements(shape.clone(), &elements)
        }
    }
    .unwrap()
}

fn round_trip(
    buffer: &SharedBuffer,
    chunk_plan: &ChunkPlan,
    mode: CodecMode,
    options: &ParallelOptions,
) -> Result<SharedBuffer, Box<dyn std::error::Error>> {
    let codec = ZfpCodec::new();
    let artifacts = compress_chunks(buffer, chunk_plan, &codec, &mode, options)?;
    assert_eq!(artifacts.len(), chunk_plan.len());
    let mut restored = SharedBuffer::allocate(buffer.shape().clone(), buffer.element_type())?;
    decompress_chunks(&artifacts, &mut restored, chunk_plan, &codec, options)?;
    Ok(restored)
}

#[test]
fn round_trip_lossless() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);
    let options = ParallelOptions::default().with_worker_count(3);
    for dimensions in SHAPES {
        let shape = Shape::new(dimensions.to_vec())?;
        for element_type in ElementType::ALL {
            let buffer = random_buffer(&shape, element_type, &mut rng);
            for policy in [
                PartitionPolicy::equal_count(1),
                PartitionPolicy::equal_count(5),
                PartitionPolicy::cache_target(64),
            ] {
                let chunk_plan = plan(&shape, element_type, &policy)?;
                let restored =
                    round_trip(&buffer, &chunk_plan, CodecMode::Tolerance(0.0), &options)?;
                assert_eq!(
                    restored.as_bytes(),
                    buffer.as_bytes(),
                    "{element_type} {shape} {policy:?}"
                );
            }
        }
    }
    Ok(())
}

#[test]
fn round_trip_tolerance() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let options = ParallelOptions::default().with_worker_count(4);
    let policy = PartitionPolicy::equal_count(4);
    for dimensions in SHAPES {
        let shape = Shape::new(dimensions.to_vec())?;
        for tolerance in [1e-3, 0.5, 10.0] {
            let mode = CodecMode::Tolerance(tolerance);

            let chunk_plan = plan(&shape, ElementType::Float32, &policy)?;
            let buffer = random_buffer(&shape, ElementType::Float32, &mut rng);
            let restored = round_trip(&buffer, &chunk_plan, mode, &options)?;
            let restored = restored.as_slice::<f32>()?;
            for (&original, &restored) in buffer.as_slice::<f32>()?.iter().zip(restored) {
                assert!((f64::from(restored) - f64::from(original)).abs() <= tolerance);
            }

            let chunk_plan = plan(&shape, ElementType::Float64, &policy)?;
            let buffer = random_buffer(&shape, ElementType::Float64, &mut rng);
            let restored = round_trip(&buffer, &chunk_plan, mode, &options)?;
            let restored = restored.as_slice::<f64>()?;
            for (&original, &restored) in buffer.as_slice::<f64>()?.iter().zip(restored) {
                assert!((restored - original).abs() <= tolerance);
            }

            let chunk_plan = plan(&shape, ElementType::Int64, &policy)?;
            let buffer = random_buffer(&shape, ElementType::Int64, &mut rng);
            let restored = round_trip(&buffer, &chunk_plan, mode, &options)?;
            let restored = restored.as_slice::<i64>()?;
            for (&original, &restored) in buffer.as_slice::<i64>()?.iter().zip(restored) {
                assert!(u128::from(restored.abs_diff(original)) <= tolerance as u128);
            }
        }

        // tolerances up to far beyond the value range
        for tolerance in [0.5, 3.0, 1e9, 1e30] {
            let chunk_plan = plan(&shape, ElementType::Int32, &policy)?;
            let buffer = random_buffer(&shape, ElementType::Int32, &mut rng);
            let restored =
                round_trip(&buffer, &chunk_plan, CodecMode::Tolerance(tolerance), &options)?;
            let restored = restored.as_slice::<i32>()?;
            for (&original, &restored) in buffer.as_slice::<i32>()?.iter().zip(restored) {
                assert!(u128::from(restored.abs_diff(original)) <= tolerance as u128);
            }
        }
    }
    Ok(())
}

#[test]
fn round_trip_fixed_rate_and_precision() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(19);
    let options = ParallelOptions::default().with_worker_count(3);
    for dimensions in SHAPES {
        let shape = Shape::new(dimensions.to_vec())?;
        for mode in [CodecMode::FixedRate(32.0), CodecMode::FixedPrecision(32)] {
            let chunk_plan = plan(&shape, ElementType::Float32, &PartitionPolicy::equal_count(3))?;
            let buffer = random_buffer(&shape, ElementType::Float32, &mut rng);
            let restored = round_trip(&buffer, &chunk_plan, mode, &options)?;
            let restored = restored.as_slice::<f32>()?;
            for (&original, &restored) in buffer.as_slice::<f32>()?.iter().zip(restored) {
                assert!((restored - original).abs() <= 1e-2, "{shape} {mode}");
            }

            let chunk_plan = plan(&shape, ElementType::Float64, &PartitionPolicy::equal_count(3))?;
            let buffer = random_buffer(&shape, ElementType::Float64, &mut rng);
            let restored = round_trip(&buffer, &chunk_plan, mode, &options)?;
            let restored = restored.as_slice::<f64>()?;
            for (&original, &restored) in buffer.as_slice::<f64>()?.iter().zip(restored) {
                assert!((restored - original).abs() <= 1e2, "{shape} {mode}");
            }
        }
    }

    // fewer bits per value compress further
    let shape = Shape::new(vec![16, 16])?;
    let buffer = random_buffer(&shape, ElementType::Float64, &mut rng);
    let chunk_plan = plan(&shape, ElementType::Float64, &PartitionPolicy::equal_count(2))?;
    let codec = ZfpCodec::new();
    let size = |mode: CodecMode| -> Result<usize, blockpar::ArrayError> {
        let artifacts = compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options)?;
        Ok(artifacts.iter().map(Vec::len).sum())
    };
    assert!(size(CodecMode::FixedRate(8.0))? < size(CodecMode::FixedRate(24.0))?);
    assert!(size(CodecMode::FixedPrecision(8))? < size(CodecMode::FixedPrecision(24))?);
    assert!(size(CodecMode::Tolerance(1e3))? < size(CodecMode::Tolerance(0.0))?);
    Ok(())
}

#[test]
fn round_trip_worker_count_independent() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(3);
    let shape = Shape::new(vec![17, 23, 6])?;
    let buffer = random_buffer(&shape, ElementType::Float64, &mut rng);
    let chunk_plan = plan(&shape, ElementType::Float64, &PartitionPolicy::cache_target(200))?;
    let codec = ZfpCodec::new();
    let mode = CodecMode::FixedPrecision(20);

    let expected = compress_chunks(
        &buffer,
        &chunk_plan,
        &codec,
        &mode,
        &ParallelOptions::default().with_worker_count(1),
    )?;
    for worker_count in [2, 3, 8] {
        let options = ParallelOptions::default().with_worker_count(worker_count);
        let artifacts = compress_chunks(&buffer, &chunk_plan, &codec, &mode, &options)?;
        assert_eq!(artifacts, expected);
    }
    Ok(())
}

#[test]
fn round_trip_equal_count_one_dimensional() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![10])?;
    let elements: Vec<f64> = (0..10).map(|i| f64::from(i) * 1.25).collect();
    let buffer = SharedBuffer::from_elements(shape.clone(), &elements)?;
    let chunk_plan = plan(&shape, ElementType::Float64, &PartitionPolicy::equal_count(3))?;
    let options = ParallelOptions::default().with_worker_count(2);
    let restored = round_trip(&buffer, &chunk_plan, CodecMode::Tolerance(0.5), &options)?;
    for (&original, &restored) in elements.iter().zip(restored.as_slice::<f64>()?) {
        assert!((restored - original).abs() <= 0.5);
    }
    Ok(())
}

#[cfg(feature = "ndarray")]
#[test]
fn round_trip_ndarray() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![6, 7])?;
    let mut buffer = SharedBuffer::allocate(shape.clone(), ElementType::Int32)?;
    buffer
        .as_ndarray_mut::<i32>()?
        .indexed_iter_mut()
        .for_each(|(index, value)| *value = i32::try_from(index[0] * 10 + index[1]).unwrap());
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(2))?;
    let options = ParallelOptions::default().with_worker_count(2);
    let restored = round_trip(&buffer, &chunk_plan, CodecMode::Tolerance(0.0), &options)?;
    let view = restored.as_ndarray::<i32>()?;
    assert_eq!(view[&[0, 0][..]], 0);
    assert_eq!(view[&[5, 6][..]], 56);
    assert_eq!(view, buffer.as_ndarray::<i32>()?);
    Ok(())
}
