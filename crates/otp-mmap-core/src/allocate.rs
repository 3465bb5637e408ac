//! Sequential address allocation.
//!
//! Partitions are placed as a fold over the specification order with an
//! explicit cursor. Placement order is physical order, so the fold must stay
//! sequential even if per-partition sizing is ever computed in parallel.

use crate::digest::{item_capacity, place_digest, DigestSlot};
use crate::LayoutError;
use otp_mmap_schema::{align_up, ItemName, MemorySpec, Partition, PartitionName};
use serde::Serialize;

/// Half-open byte range `[start, end)` left unused for alignment or padding.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Region {
    pub start: u64,
    pub end: u64,
}

impl Region {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemLayout {
    pub name: ItemName,
    /// Absolute byte offset.
    pub offset: u64,
    /// Offset relative to the partition start.
    pub relative_offset: u64,
    pub size: u64,
}

impl ItemLayout {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Absolute placement of one partition, its items, padding, and digest slot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartitionLayout {
    pub name: PartitionName,
    pub start: u64,
    pub end: u64,
    pub items: Vec<ItemLayout>,
    /// Unused ranges inside the partition, in address order.
    pub padding: Vec<Region>,
    pub digest: Option<DigestSlot>,
}

impl PartitionLayout {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }
}

/// Result of placing every partition of a specification.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Allocation {
    pub partitions: Vec<PartitionLayout>,
    /// Alignment gaps inserted between partitions.
    pub gaps: Vec<Region>,
    /// First byte after the last partition.
    pub end: u64,
}

/// Assign absolute offsets to every partition and item of a validated `spec`.
pub fn allocate(spec: &MemorySpec) -> Result<Allocation, LayoutError> {
    let total = spec.total_size();
    let init = Allocation {
        partitions: Vec::with_capacity(spec.partitions.len()),
        gaps: Vec::new(),
        end: 0,
    };

    spec.partitions.iter().try_fold(init, |mut acc, partition| {
        let overflow = || LayoutError::RegionOverflow {
            required: u64::MAX,
            total,
        };
        let start = align_up(acc.end, partition.alignment).ok_or_else(overflow)?;
        let end = start.checked_add(partition.size).ok_or_else(overflow)?;
        if end > total {
            return Err(LayoutError::RegionOverflow {
                required: end,
                total,
            });
        }
        if start > acc.end {
            acc.gaps.push(Region {
                start: acc.end,
                end: start,
            });
        }
        acc.partitions.push(place_partition(partition, start)?);
        acc.end = end;
        Ok(acc)
    })
}

fn place_partition(partition: &Partition, start: u64) -> Result<PartitionLayout, LayoutError> {
    let capacity = item_capacity(partition)?;
    let mut items = Vec::with_capacity(partition.items.len());
    let mut padding = Vec::new();
    let mut cursor = 0u64;

    for item in &partition.items {
        let relative = match item.offset {
            Some(offset) if offset < cursor => {
                return Err(LayoutError::UnreachableOffset {
                    partition: partition.name.to_string(),
                    item: item.name.to_string(),
                    offset,
                    cursor,
                });
            }
            Some(offset) => offset,
            None => cursor,
        };
        let relative_end = relative.saturating_add(item.size);
        if relative_end > capacity {
            return Err(LayoutError::ItemsExceedCapacity {
                partition: partition.name.to_string(),
                item: item.name.to_string(),
                end: relative_end,
                capacity,
            });
        }
        if relative > cursor {
            padding.push(Region {
                start: start + cursor,
                end: start + relative,
            });
        }
        items.push(ItemLayout {
            name: item.name.clone(),
            offset: start + relative,
            relative_offset: relative,
            size: item.size,
        });
        cursor = relative_end;
    }

    if cursor < capacity {
        padding.push(Region {
            start: start + cursor,
            end: start + capacity,
        });
    }

    Ok(PartitionLayout {
        name: partition.name.clone(),
        start,
        end: start + partition.size,
        items,
        padding,
        digest: place_digest(partition, start)?,
    })
}
