//! Layout engine for OTP memory maps.
//!
//! This crate turns a normalized [`MemorySpec`](otp_mmap_schema::MemorySpec) into
//! a [`ResolvedLayout`]: it validates structural constraints, allocates aligned
//! partition and item ranges in specification order, reserves trailing digest
//! slots, resolves the effective seed and derives reproducible netlist
//! constants from it. The resolved layout is read-only and exposes the rows
//! consumed by documentation tables and template renderers.

pub mod allocate;
pub mod constants;
pub mod digest;
pub mod engine;
pub mod layout;
pub mod seed;
pub mod tables;
pub mod validate;

pub use allocate::{allocate, Allocation, ItemLayout, PartitionLayout, Region};
pub use constants::{generate_constants, Constant, ConstantKind, ConstantSet, MAX_CONSTANT_WIDTH};
pub use digest::{item_capacity, place_digest, DigestSlot};
pub use engine::{Engine, GenerateOptions};
pub use layout::{DigestRow, MapEntry, MapEntryKind, PartitionRow, ResolvedLayout};
pub use seed::{parse_seed, resolve_seed, EffectiveSeed, FixedSeed, OsEntropy, SeedOrigin, SeedSource};
pub use tables::{digests_table, mmap_table, partitions_table, TABLE_HEADER_COMMENT};
pub use validate::validate;

pub use otp_mmap_schema::{DIGEST_WIDTH, WORD_GRANULARITY};

use thiserror::Error;

/// Structural violation found while validating or allocating a memory map.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
    #[error("partition '{partition}': size {size} is not a positive multiple of {granularity} bytes")]
    SizeNotMultiple {
        partition: String,
        size: u64,
        granularity: u64,
    },
    #[error("partition '{partition}': alignment {alignment} must be a power of two not exceeding the region size {total}")]
    InvalidAlignment {
        partition: String,
        alignment: u64,
        total: u64,
    },
    #[error("partition '{partition}': item '{item}' has zero size")]
    ZeroItemSize { partition: String, item: String },
    #[error("partition '{partition}': item '{item}' ends at byte {end}, past the partition size {size}")]
    ItemOutOfBounds {
        partition: String,
        item: String,
        end: u64,
        size: u64,
    },
    #[error("partition '{partition}': items '{first}' and '{second}' overlap")]
    ItemOverlap {
        partition: String,
        first: String,
        second: String,
    },
    #[error("partitions require {required} bytes but the region only holds {total}")]
    RegionOverflow { required: u64, total: u64 },
    #[error("partition '{partition}': item '{item}' at fixed offset {offset} is unreachable, the previous item ends at {cursor}")]
    UnreachableOffset {
        partition: String,
        item: String,
        offset: u64,
        cursor: u64,
    },
    #[error("partition '{partition}': item '{item}' ends at byte {end}, past the {capacity} bytes available to items")]
    ItemsExceedCapacity {
        partition: String,
        item: String,
        end: u64,
        capacity: u64,
    },
    #[error("partition '{partition}': size {size} cannot hold a {width}-byte digest")]
    DigestTooLarge {
        partition: String,
        size: u64,
        width: u64,
    },
    #[error("constant '{name}': explicit value needs {bytes} bytes but the field holds {width}")]
    ConstantTooWide { name: String, bytes: u64, width: u64 },
    #[error("constant '{name}': width of {width} bytes exceeds the {max}-byte limit")]
    ConstantWidthExceeded { name: String, width: u64, max: u64 },
}

/// Invalid seed in the specification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed must not be negative: {0}")]
    Negative(i64),
    #[error("seed '{0}' is not a 64-bit unsigned integer")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] otp_mmap_schema::ConfigError),
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("seed error: {0}")]
    Seed(#[from] SeedError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_error_names_partition() {
        let e = LayoutError::DigestTooLarge {
            partition: "A".to_owned(),
            size: 4,
            width: 8,
        };
        assert!(e.to_string().contains("partition 'A'"));
    }

    #[test]
    fn core_error_wraps_with_prefix() {
        let e = CoreError::from(LayoutError::RegionOverflow {
            required: 256,
            total: 128,
        });
        assert!(e.to_string().starts_with("layout error:"));
        let e = CoreError::from(SeedError::Negative(-1));
        assert!(e.to_string().starts_with("seed error:"));
    }
}
