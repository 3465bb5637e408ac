use crate::spec::{
    ConfigError, DigestKind, ItemSection, Literal, LockKind, PartitionSection, RawSpec,
    ScramblingSection, Variant,
};
use crate::types::{ItemName, PartitionName};
use crate::{align_up, DIGEST_WIDTH, WORD_GRANULARITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fully typed memory map specification.
///
/// All optional fields are resolved to defaults and partition policies are
/// checked. Structural layout rules (overlap, alignment, capacity) are left to
/// the validator. The seed stays exactly as written, or absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemorySpec {
    pub seed: Option<Literal>,
    pub otp: OtpGeometry,
    pub scrambling: Scrambling,
    pub partitions: Vec<Partition>,
}

/// Physical shape of the OTP macro.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtpGeometry {
    /// Bytes per OTP word.
    pub width: u64,
    /// Number of OTP words.
    pub depth: u64,
    /// `width * depth`, checked for overflow during normalization.
    pub total_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scrambling {
    pub key_size: u64,
    pub iv_size: u64,
    pub cnst_size: u64,
    pub keys: Vec<ScramblingKey>,
    pub digests: Vec<DigestConstants>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScramblingKey {
    pub name: String,
    pub value: ConstantValue,
}

/// IV and finalization constant pair of one digest flavor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DigestConstants {
    pub name: String,
    pub iv_value: ConstantValue,
    pub cnst_value: ConstantValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partition {
    pub name: PartitionName,
    pub size: u64,
    pub alignment: u64,
    pub secret: bool,
    pub digest: DigestKind,
    pub variant: Variant,
    pub write_lock: LockKind,
    pub read_lock: LockKind,
    pub key_sel: Option<String>,
    pub desc: String,
    pub items: Vec<Item>,
}

impl Partition {
    pub fn has_digest(&self) -> bool {
        self.digest.is_present()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub name: ItemName,
    pub size: u64,
    /// Fixed offset relative to the partition start; contiguous placement when absent.
    pub offset: Option<u64>,
    pub inv_default: Option<ConstantValue>,
    pub desc: String,
}

/// A constant to be derived from the seed, or one given verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstantValue {
    Random,
    /// Big-endian bytes with leading zeros stripped; zero is the empty vector.
    Explicit(Vec<u8>),
}

impl RawSpec {
    /// Normalize the specification: fill defaults, derive omitted partition
    /// sizes, and enforce partition policies.
    pub fn normalize(&self) -> Result<MemorySpec, ConfigError> {
        if self.otp.width == 0 {
            return Err(zero("otp.width"));
        }
        if self.otp.depth == 0 {
            return Err(zero("otp.depth"));
        }
        let total_size = self
            .otp
            .width
            .checked_mul(self.otp.depth)
            .ok_or_else(|| ConfigError::Overflow {
                field: "otp.depth".to_owned(),
            })?;

        let scrambling = normalize_scrambling(&self.scrambling)?;
        let key_names: BTreeSet<&str> = scrambling.keys.iter().map(|k| k.name.as_str()).collect();

        let mut partitions = Vec::with_capacity(self.partitions.len());
        for (idx, raw) in self.partitions.iter().enumerate() {
            partitions.push(normalize_partition(idx, raw, &key_names)?);
        }

        Ok(MemorySpec {
            seed: self.seed.clone(),
            otp: OtpGeometry {
                width: self.otp.width,
                depth: self.otp.depth,
                total_size,
            },
            scrambling,
            partitions,
        })
    }
}

impl MemorySpec {
    pub fn total_size(&self) -> u64 {
        self.otp.total_size
    }

    /// Copy of this specification with the realized seed recorded in it.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> MemorySpec {
        MemorySpec {
            seed: Some(Literal::from(seed)),
            ..self.clone()
        }
    }
}

fn normalize_scrambling(raw: &ScramblingSection) -> Result<Scrambling, ConfigError> {
    for (field, value) in [
        ("scrambling.key_size", raw.key_size),
        ("scrambling.iv_size", raw.iv_size),
        ("scrambling.cnst_size", raw.cnst_size),
    ] {
        if value == 0 {
            return Err(zero(field));
        }
    }

    let mut seen = BTreeSet::new();
    let mut keys = Vec::with_capacity(raw.keys.len());
    for (idx, key) in raw.keys.iter().enumerate() {
        let name = required_name(&key.name, &format!("scrambling.keys[{idx}].name"))?;
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateScramblingName(name));
        }
        let value = parse_constant(&key.value, &format!("scrambling.keys[{idx}].value"))?;
        keys.push(ScramblingKey { name, value });
    }

    let mut digests = Vec::with_capacity(raw.digests.len());
    for (idx, digest) in raw.digests.iter().enumerate() {
        let field = format!("scrambling.digests[{idx}]");
        let name = required_name(&digest.name, &format!("{field}.name"))?;
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateScramblingName(name));
        }
        digests.push(DigestConstants {
            name,
            iv_value: parse_constant(&digest.iv_value, &format!("{field}.iv_value"))?,
            cnst_value: parse_constant(&digest.cnst_value, &format!("{field}.cnst_value"))?,
        });
    }

    Ok(Scrambling {
        key_size: raw.key_size,
        iv_size: raw.iv_size,
        cnst_size: raw.cnst_size,
        keys,
        digests,
    })
}

fn normalize_partition(
    idx: usize,
    raw: &PartitionSection,
    key_names: &BTreeSet<&str>,
) -> Result<Partition, ConfigError> {
    let field = format!("partitions[{idx}]");
    let name = required_name(&raw.name, &format!("{field}.name"))?;
    let policy = |reason: &str| ConfigError::Policy {
        partition: name.clone(),
        reason: reason.to_owned(),
    };

    match (raw.secret, raw.key_sel.as_deref().map(str::trim)) {
        (true, None) => return Err(policy("secret partitions require key_sel")),
        (true, Some(key)) if !key_names.contains(key) => {
            return Err(ConfigError::UnknownKey {
                partition: name.clone(),
                key: key.to_owned(),
            })
        }
        (false, Some(_)) => return Err(policy("key_sel is only valid on secret partitions")),
        _ => {}
    }
    if raw.secret && raw.variant != Variant::Buffered {
        return Err(policy("secret partitions must be buffered"));
    }
    if raw.variant == Variant::LifeCycle && raw.digest.is_present() {
        return Err(policy("life cycle partitions cannot carry a digest"));
    }
    if raw.variant == Variant::Unbuffered && raw.digest == DigestKind::Hw {
        return Err(policy("hardware digests require a buffered partition"));
    }
    if !raw.digest.is_present()
        && (raw.write_lock == LockKind::Digest || raw.read_lock == LockKind::Digest)
    {
        return Err(policy("digest locks require a digest"));
    }

    let mut items = Vec::with_capacity(raw.items.len());
    for (item_idx, item) in raw.items.iter().enumerate() {
        items.push(normalize_item(&format!("{field}.items[{item_idx}]"), item)?);
    }

    let size = match raw.size {
        Some(0) => return Err(zero(&format!("{field}.size"))),
        Some(size) => size,
        None => match minimal_size(&items, raw.digest) {
            Some(0) => return Err(zero(&format!("{field}.size"))),
            Some(size) => size,
            None => {
                return Err(ConfigError::Overflow {
                    field: format!("{field}.size"),
                })
            }
        },
    };
    let alignment = match raw.alignment {
        Some(0) => return Err(zero(&format!("{field}.alignment"))),
        Some(alignment) => alignment,
        None => WORD_GRANULARITY,
    };

    Ok(Partition {
        name: PartitionName::new(name),
        size,
        alignment,
        secret: raw.secret,
        digest: raw.digest,
        variant: raw.variant,
        write_lock: raw.write_lock,
        read_lock: raw.read_lock,
        key_sel: raw.key_sel.as_deref().map(|k| k.trim().to_owned()),
        desc: raw.desc.trim().to_owned(),
        items,
    })
}

fn normalize_item(field: &str, raw: &ItemSection) -> Result<Item, ConfigError> {
    let name = required_name(&raw.name, &format!("{field}.name"))?;
    if raw.size == 0 {
        return Err(zero(&format!("{field}.size")));
    }
    let inv_default = raw
        .inv_default
        .as_ref()
        .map(|lit| parse_constant(lit, &format!("{field}.inv_default")))
        .transpose()?;
    Ok(Item {
        name: ItemName::new(name),
        size: raw.size,
        offset: raw.offset,
        inv_default,
        desc: raw.desc.trim().to_owned(),
    })
}

/// Smallest word-granular size holding the items in declaration order plus
/// the digest slot. `None` on arithmetic overflow.
fn minimal_size(items: &[Item], digest: DigestKind) -> Option<u64> {
    let mut cursor = 0u64;
    let mut extent = 0u64;
    for item in items {
        let start = item.offset.unwrap_or(cursor);
        cursor = start.checked_add(item.size)?;
        extent = extent.max(cursor);
    }
    if digest.is_present() {
        extent = extent.checked_add(DIGEST_WIDTH)?;
    }
    align_up(extent, WORD_GRANULARITY)
}

fn required_name(raw: &str, field: &str) -> Result<String, ConfigError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ConfigError::EmptyName {
            field: field.to_owned(),
        });
    }
    Ok(name.to_owned())
}

fn zero(field: &str) -> ConfigError {
    ConfigError::ZeroSize {
        field: field.to_owned(),
    }
}

/// Parse a constant literal: `<random>`, a non-negative integer, a decimal
/// string, or a `0x`-prefixed hex string of arbitrary width.
pub fn parse_constant(literal: &Literal, field: &str) -> Result<ConstantValue, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        field: field.to_owned(),
        value: literal.to_string(),
    };
    if literal.is_random() {
        return Ok(ConstantValue::Random);
    }
    let bytes = match literal {
        Literal::Integer(v) => {
            let v = u64::try_from(*v).map_err(|_| invalid())?;
            v.to_be_bytes().to_vec()
        }
        Literal::Text(text) => {
            let text = text.trim().replace('_', "");
            if let Some(hex) = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
            {
                parse_hex(hex).ok_or_else(invalid)?
            } else {
                let v: u128 = text.parse().map_err(|_| invalid())?;
                v.to_be_bytes().to_vec()
            }
        }
    };
    Ok(ConstantValue::Explicit(strip_leading_zeros(&bytes)))
}

fn parse_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_owned()
    };
    (0..padded.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&padded[i..i + 2], 16).ok())
        .collect()
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}
