//! Digest slot placement.
//!
//! A digest-bearing partition always keeps its digest in its trailing
//! `DIGEST_WIDTH` bytes, so the digest covers every item placed before it.

use crate::LayoutError;
use otp_mmap_schema::{DigestKind, ItemName, Partition, DIGEST_WIDTH};
use serde::Serialize;

/// Reserved region holding the integrity digest of a partition.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DigestSlot {
    pub name: ItemName,
    pub kind: DigestKind,
    /// Absolute byte offset.
    pub offset: u64,
    pub width: u64,
}

impl DigestSlot {
    pub fn end(&self) -> u64 {
        self.offset + self.width
    }

    pub fn computed_by_hw(&self) -> bool {
        self.kind == DigestKind::Hw
    }
}

/// Number of bytes at the start of `partition` available to ordinary items.
pub fn item_capacity(partition: &Partition) -> Result<u64, LayoutError> {
    if !partition.has_digest() {
        return Ok(partition.size);
    }
    partition
        .size
        .checked_sub(DIGEST_WIDTH)
        .ok_or_else(|| LayoutError::DigestTooLarge {
            partition: partition.name.to_string(),
            size: partition.size,
            width: DIGEST_WIDTH,
        })
}

/// Carve the digest slot from the end of `partition` placed at absolute `start`.
pub fn place_digest(partition: &Partition, start: u64) -> Result<Option<DigestSlot>, LayoutError> {
    if !partition.has_digest() {
        return Ok(None);
    }
    let capacity = item_capacity(partition)?;
    Ok(Some(DigestSlot {
        name: partition.name.digest_name(),
        kind: partition.digest,
        offset: start + capacity,
        width: DIGEST_WIDTH,
    }))
}
