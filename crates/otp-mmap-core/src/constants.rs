//! Seeded netlist constant generation.
//!
//! A single ChaCha8 stream seeded with the effective seed is consumed in a
//! fixed order: scrambling keys, then digest IV/constant pairs, then item
//! inverse defaults in partition and item order. Explicit values never draw
//! from the stream. ChaCha8 output is fully specified, so the same seed and
//! specification produce identical constants on every host.

use crate::LayoutError;
use otp_mmap_schema::{ConstantValue, MemorySpec};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Serializer};
use std::fmt::Write as _;

/// Widest constant, in bytes, that may be generated or padded.
///
/// Item widths are bounded only by the region size, so every field is checked
/// against this limit before its buffer is allocated.
pub const MAX_CONSTANT_WIDTH: u64 = 4096;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstantKind {
    ScramblingKey,
    DigestIv,
    DigestConstant,
    InvDefault,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub kind: ConstantKind,
    /// Width in bytes.
    pub width: u64,
    /// Big-endian value, exactly `width` bytes long.
    #[serde(serialize_with = "serialize_hex")]
    pub value: Vec<u8>,
    /// Whether the value was drawn from the seeded stream.
    pub random: bool,
}

impl Constant {
    /// `0x`-prefixed, zero-padded hex rendering of the value.
    pub fn to_hex(&self) -> String {
        to_hex(&self.value)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(bytes))
}

/// Ordered collection of generated constants, looked up by name.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConstantSet {
    entries: Vec<Constant>,
}

impl ConstantSet {
    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Generator {
    rng: ChaCha8Rng,
    entries: Vec<Constant>,
}

impl Generator {
    fn push(
        &mut self,
        name: String,
        kind: ConstantKind,
        width: u64,
        value: &ConstantValue,
    ) -> Result<(), LayoutError> {
        if width > MAX_CONSTANT_WIDTH {
            return Err(LayoutError::ConstantWidthExceeded {
                name,
                width,
                max: MAX_CONSTANT_WIDTH,
            });
        }
        let (value, random) = match value {
            ConstantValue::Random => {
                let mut buf = vec![0u8; width as usize];
                self.rng.fill_bytes(&mut buf);
                (buf, true)
            }
            ConstantValue::Explicit(bytes) => {
                let len = bytes.len() as u64;
                if len > width {
                    return Err(LayoutError::ConstantTooWide {
                        name,
                        bytes: len,
                        width,
                    });
                }
                let mut buf = vec![0u8; (width - len) as usize];
                buf.extend_from_slice(bytes);
                (buf, false)
            }
        };
        self.entries.push(Constant {
            name,
            kind,
            width,
            value,
            random,
        });
        Ok(())
    }
}

/// Derive every constant of `spec` from `seed`.
pub fn generate_constants(spec: &MemorySpec, seed: u64) -> Result<ConstantSet, LayoutError> {
    let mut gen = Generator {
        rng: ChaCha8Rng::seed_from_u64(seed),
        entries: Vec::new(),
    };
    let scrambling = &spec.scrambling;

    for key in &scrambling.keys {
        gen.push(
            key.name.clone(),
            ConstantKind::ScramblingKey,
            scrambling.key_size,
            &key.value,
        )?;
    }
    for digest in &scrambling.digests {
        gen.push(
            format!("{}_IV", digest.name),
            ConstantKind::DigestIv,
            scrambling.iv_size,
            &digest.iv_value,
        )?;
        gen.push(
            format!("{}_CNST", digest.name),
            ConstantKind::DigestConstant,
            scrambling.cnst_size,
            &digest.cnst_value,
        )?;
    }
    for partition in &spec.partitions {
        for item in &partition.items {
            if let Some(value) = &item.inv_default {
                gen.push(
                    format!("{}_INV_DEFAULT", item.name),
                    ConstantKind::InvDefault,
                    item.size,
                    value,
                )?;
            }
        }
    }

    Ok(ConstantSet {
        entries: gen.entries,
    })
}
