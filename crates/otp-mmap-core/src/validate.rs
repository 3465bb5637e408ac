//! Structural checks run before any address is assigned.
//!
//! Rules are checked in a fixed order and the first violation is returned, so
//! the same specification always yields the same diagnostic.

use crate::LayoutError;
use otp_mmap_schema::{align_up, MemorySpec, Partition, WORD_GRANULARITY};
use std::collections::BTreeSet;

/// Validate `spec`, returning the first violated rule.
///
/// 1. names are unique (partitions, items, derived digest names)
/// 2. partition sizes are positive multiples of the word granularity
/// 3. alignments are powers of two no larger than the region
/// 4. items are non-empty and fixed offsets stay inside their partition
/// 5. fixed-offset items do not overlap
/// 6. partitions plus alignment padding fit the region
pub fn validate(spec: &MemorySpec) -> Result<(), LayoutError> {
    check_unique_names(spec)?;
    for partition in &spec.partitions {
        check_size(partition)?;
    }
    for partition in &spec.partitions {
        check_alignment(partition, spec.total_size())?;
    }
    for partition in &spec.partitions {
        check_item_bounds(partition)?;
    }
    for partition in &spec.partitions {
        check_item_overlap(partition)?;
    }
    check_region_capacity(spec)
}

fn check_unique_names(spec: &MemorySpec) -> Result<(), LayoutError> {
    let mut seen = BTreeSet::new();
    for partition in &spec.partitions {
        if !seen.insert(partition.name.as_str()) {
            return Err(LayoutError::DuplicateName(partition.name.to_string()));
        }
    }

    let mut names = BTreeSet::new();
    for partition in &spec.partitions {
        for item in &partition.items {
            if !names.insert(item.name.to_string()) {
                return Err(LayoutError::DuplicateName(item.name.to_string()));
            }
        }
    }
    for partition in spec.partitions.iter().filter(|p| p.has_digest()) {
        let digest = partition.name.digest_name();
        if !names.insert(digest.to_string()) {
            return Err(LayoutError::DuplicateName(digest.into_inner()));
        }
    }
    Ok(())
}

fn check_size(partition: &Partition) -> Result<(), LayoutError> {
    if partition.size == 0 || partition.size % WORD_GRANULARITY != 0 {
        return Err(LayoutError::SizeNotMultiple {
            partition: partition.name.to_string(),
            size: partition.size,
            granularity: WORD_GRANULARITY,
        });
    }
    Ok(())
}

fn check_alignment(partition: &Partition, total: u64) -> Result<(), LayoutError> {
    if !partition.alignment.is_power_of_two() || partition.alignment > total {
        return Err(LayoutError::InvalidAlignment {
            partition: partition.name.to_string(),
            alignment: partition.alignment,
            total,
        });
    }
    Ok(())
}

fn check_item_bounds(partition: &Partition) -> Result<(), LayoutError> {
    for item in &partition.items {
        if item.size == 0 {
            return Err(LayoutError::ZeroItemSize {
                partition: partition.name.to_string(),
                item: item.name.to_string(),
            });
        }
        let Some(offset) = item.offset else {
            continue;
        };
        let end = offset.saturating_add(item.size);
        if end > partition.size {
            return Err(LayoutError::ItemOutOfBounds {
                partition: partition.name.to_string(),
                item: item.name.to_string(),
                end,
                size: partition.size,
            });
        }
    }
    Ok(())
}

fn check_item_overlap(partition: &Partition) -> Result<(), LayoutError> {
    let fixed: Vec<_> = partition
        .items
        .iter()
        .filter_map(|item| item.offset.map(|off| (item, off, off + item.size)))
        .collect();
    for (i, (a, a_start, a_end)) in fixed.iter().enumerate() {
        for (b, b_start, b_end) in &fixed[i + 1..] {
            if a_start < b_end && b_start < a_end {
                return Err(LayoutError::ItemOverlap {
                    partition: partition.name.to_string(),
                    first: a.name.to_string(),
                    second: b.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_region_capacity(spec: &MemorySpec) -> Result<(), LayoutError> {
    let total = spec.total_size();
    let mut cursor = 0u64;
    for partition in &spec.partitions {
        cursor = align_up(cursor, partition.alignment)
            .and_then(|start| start.checked_add(partition.size))
            .ok_or(LayoutError::RegionOverflow {
                required: u64::MAX,
                total,
            })?;
    }
    if cursor > total {
        return Err(LayoutError::RegionOverflow {
            required: cursor,
            total,
        });
    }
    Ok(())
}
