#![allow(missing_docs)]

use blockpar::{ChunkPlan, ElementType, PartitionPolicy, Shape, SharedBuffer, plan};

fn policies() -> Vec<PartitionPolicy> {
    vec![
        PartitionPolicy::equal_count(1),
        PartitionPolicy::equal_count(3),
        PartitionPolicy::equal_count(7),
        PartitionPolicy::equal_count(1000),
        PartitionPolicy::cache_target(1),
        PartitionPolicy::cache_target(100),
        PartitionPolicy::CacheTarget {
            bytes_per_chunk: 4096,
            estimated_compression_ratio: 1.5,
        },
    ]
}

fn shapes() -> Vec<Vec<u64>> {
    vec![
        vec![1],
        vec![10],
        vec![33],
        vec![4, 4],
        vec![9, 13],
        vec![5, 1, 7],
        vec![8, 8, 8],
        vec![3, 6, 5, 9],
    ]
}

/// The byte ranges of all regions tile the buffer exactly once.
fn assert_regions_tile_buffer(buffer: &SharedBuffer, chunk_plan: &ChunkPlan) {
    let regions = buffer.regions(chunk_plan).unwrap();
    assert_eq!(regions.len(), chunk_plan.len());
    let mut ranges: Vec<_> = regions
        .iter()
        .flat_map(|region| region.byte_ranges())
        .collect();
    ranges.sort_by_key(|range| range.start);
    let mut end = 0;
    for range in ranges {
        assert_eq!(range.start, end, "gap or overlap at byte {end}");
        assert!(!range.is_empty());
        end = range.end;
    }
    assert_eq!(end, buffer.size());
    assert_eq!(
        regions.iter().map(blockpar::ChunkRegion::num_bytes).sum::<usize>(),
        buffer.size()
    );
}

#[test]
fn partition_regions_disjoint_and_complete() -> Result<(), Box<dyn std::error::Error>> {
    for dimensions in shapes() {
        for element_type in ElementType::ALL {
            for policy in policies() {
                let shape = Shape::new(dimensions.clone())?;
                let chunk_plan = plan(&shape, element_type, &policy)?;

                // chunks are consecutive runs of the block enumeration
                let mut next = 0;
                for (index, chunk) in chunk_plan.chunks().iter().enumerate() {
                    assert_eq!(chunk.index(), index);
                    assert_eq!(chunk.blocks().start, next);
                    assert!(chunk.num_blocks() > 0);
                    next = chunk.blocks().end;
                }
                assert_eq!(next, chunk_plan.grid().num_blocks());

                let buffer = SharedBuffer::allocate(shape, element_type)?;
                assert_regions_tile_buffer(&buffer, &chunk_plan);
            }
        }
    }
    Ok(())
}

#[test]
fn partition_deterministic() -> Result<(), Box<dyn std::error::Error>> {
    for dimensions in shapes() {
        for policy in policies() {
            let shape = Shape::new(dimensions.clone())?;
            let first = plan(&shape, ElementType::Float32, &policy)?;
            let second = plan(&shape, ElementType::Float32, &policy)?;
            assert_eq!(first, second);
            assert_eq!(first.block_splits(), second.block_splits());
        }
    }
    Ok(())
}

#[test]
fn partition_equal_count_one_dimensional() -> Result<(), Box<dyn std::error::Error>> {
    // 10 elements are 3 blocks, so 3 parts are 3 one-block chunks
    let shape = Shape::new(vec![10])?;
    let chunk_plan = plan(&shape, ElementType::Int64, &PartitionPolicy::equal_count(3))?;
    assert_eq!(chunk_plan.grid().num_blocks(), 3);
    assert_eq!(chunk_plan.block_splits(), vec![vec![0, 1], vec![1, 2], vec![2, 3]]);
    assert_eq!(chunk_plan.chunk_num_elements(0), Some(4));
    assert_eq!(chunk_plan.chunk_num_elements(1), Some(4));
    assert_eq!(chunk_plan.chunk_num_elements(2), Some(2));

    let buffer = SharedBuffer::from_elements(shape, &(0..10i64).collect::<Vec<_>>())?;
    let regions = buffer.regions(&chunk_plan)?;
    let elements = |bytes: Vec<u8>| -> Vec<i64> { bytemuck::pod_collect_to_vec(&bytes) };
    assert_eq!(elements(regions[0].to_bytes()), vec![0, 1, 2, 3]);
    assert_eq!(elements(regions[1].to_bytes()), vec![4, 5, 6, 7]);
    assert_eq!(elements(regions[2].to_bytes()), vec![8, 9]);
    Ok(())
}

#[test]
fn partition_single_chunk() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![12, 12])?;
    for policy in [
        PartitionPolicy::equal_count(1),
        PartitionPolicy::cache_target(u64::MAX),
    ] {
        let chunk_plan = plan(&shape, ElementType::Float64, &policy)?;
        assert_eq!(chunk_plan.block_splits(), vec![vec![0, 9]]);
    }
    Ok(())
}

#[test]
fn partition_from_block_splits() -> Result<(), Box<dyn std::error::Error>> {
    let shape = Shape::new(vec![9, 13])?;
    let chunk_plan = plan(&shape, ElementType::Int32, &PartitionPolicy::equal_count(4))?;
    let restored = ChunkPlan::from_block_splits(
        chunk_plan.grid().clone(),
        ElementType::Int32,
        &chunk_plan.block_splits(),
    )?;
    assert_eq!(restored, chunk_plan);
    Ok(())
}
