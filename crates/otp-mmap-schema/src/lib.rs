//! Specification parsing and normalization for the OTP memory map generator.
//!
//! This crate defines the schema layer: TOML specification parsing (`RawSpec`),
//! the normalized, fully typed representation (`MemorySpec`), the name newtypes
//! shared with the layout engine, and the platform granularity constants.

pub mod normalize;
pub mod spec;
pub mod types;

pub use normalize::{
    parse_constant, ConstantValue, DigestConstants, Item, MemorySpec, OtpGeometry, Partition,
    Scrambling, ScramblingKey,
};
pub use spec::{
    parse_spec_file, parse_spec_str, ConfigError, DigestConstSection, DigestKind, ItemSection,
    KeySection, Literal, LockKind, OtpSection, PartitionSection, RawSpec, ScramblingSection,
    Variant,
};
pub use types::{ItemName, PartitionName};

/// Partition sizes are a multiple of this many bytes (one scrambling block).
pub const WORD_GRANULARITY: u64 = 8;

/// Width in bytes of the digest slot reserved at the end of a partition.
pub const DIGEST_WIDTH: u64 = 8;

/// Round `value` up to the next multiple of `align`. `None` on overflow.
///
/// `align` must be non-zero.
pub fn align_up(value: u64, align: u64) -> Option<u64> {
    let rem = value % align;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(align - rem)
    }
}
