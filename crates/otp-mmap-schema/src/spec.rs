use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read specification file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse specification: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("{field} must not be empty")]
    EmptyName { field: String },
    #[error("{field} must be greater than zero")]
    ZeroSize { field: String },
    #[error("{field} overflows the 64-bit address space")]
    Overflow { field: String },
    #[error("invalid value for {field}: '{value}' (expected '<random>', an integer, or a 0x-prefixed hex string)")]
    InvalidValue { field: String, value: String },
    #[error("partition '{partition}': {reason}")]
    Policy { partition: String, reason: String },
    #[error("partition '{partition}' selects unknown scrambling key '{key}'")]
    UnknownKey { partition: String, key: String },
    #[error("duplicate scrambling entry name: '{0}'")]
    DuplicateScramblingName(String),
}

/// Literal as written in the specification: a TOML integer or a string.
///
/// Strings carry `<random>`, decimal, or `0x`-prefixed hex values. Seeds wider
/// than `i64::MAX` must be written as strings since TOML integers are signed.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl Literal {
    pub const RANDOM: &'static str = "<random>";

    pub fn random() -> Self {
        Literal::Text(Self::RANDOM.to_owned())
    }

    pub fn is_random(&self) -> bool {
        matches!(self, Literal::Text(s) if s.trim() == Self::RANDOM)
    }
}

impl From<u64> for Literal {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Literal::Integer(v),
            Err(_) => Literal::Text(value.to_string()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

/// Which agent computes the integrity digest of a partition, if any.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    #[default]
    None,
    Sw,
    Hw,
}

impl DigestKind {
    pub fn is_present(self) -> bool {
        !matches!(self, DigestKind::None)
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DigestKind::None => "none",
            DigestKind::Sw => "sw",
            DigestKind::Hw => "hw",
        };
        f.write_str(s)
    }
}

/// Controller variant backing a partition.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    #[default]
    Unbuffered,
    Buffered,
    #[serde(rename = "lifecycle")]
    LifeCycle,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Variant::Unbuffered => "unbuffered",
            Variant::Buffered => "buffered",
            Variant::LifeCycle => "lifecycle",
        };
        f.write_str(s)
    }
}

/// Mechanism that locks a partition against further writes or reads.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LockKind {
    #[default]
    None,
    Csr,
    Digest,
}

impl LockKind {
    pub fn is_lockable(self) -> bool {
        !matches!(self, LockKind::None)
    }
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockKind::None => "none",
            LockKind::Csr => "csr",
            LockKind::Digest => "digest",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RawSpec {
    #[serde(default)]
    pub seed: Option<Literal>,
    pub otp: OtpSection,
    #[serde(default)]
    pub scrambling: ScramblingSection,
    #[serde(default)]
    pub partitions: Vec<PartitionSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OtpSection {
    pub width: u64,
    pub depth: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScramblingSection {
    #[serde(default = "default_key_size")]
    pub key_size: u64,
    #[serde(default = "default_iv_size")]
    pub iv_size: u64,
    #[serde(default = "default_cnst_size")]
    pub cnst_size: u64,
    #[serde(default)]
    pub keys: Vec<KeySection>,
    #[serde(default)]
    pub digests: Vec<DigestConstSection>,
}

impl Default for ScramblingSection {
    fn default() -> Self {
        Self {
            key_size: default_key_size(),
            iv_size: default_iv_size(),
            cnst_size: default_cnst_size(),
            keys: Vec::new(),
            digests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeySection {
    pub name: String,
    #[serde(default = "Literal::random")]
    pub value: Literal,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DigestConstSection {
    pub name: String,
    #[serde(default = "Literal::random")]
    pub iv_value: Literal,
    #[serde(default = "Literal::random")]
    pub cnst_value: Literal,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PartitionSection {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub alignment: Option<u64>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub digest: DigestKind,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub write_lock: LockKind,
    #[serde(default)]
    pub read_lock: LockKind,
    #[serde(default)]
    pub key_sel: Option<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub items: Vec<ItemSection>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ItemSection {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub inv_default: Option<Literal>,
    #[serde(default)]
    pub desc: String,
}

fn default_key_size() -> u64 {
    16
}

fn default_iv_size() -> u64 {
    8
}

fn default_cnst_size() -> u64 {
    16
}

pub fn parse_spec_str(input: &str) -> Result<RawSpec, ConfigError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_spec_file(path: impl AsRef<Path>) -> Result<RawSpec, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_spec_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_spec() {
        let input = r#"
seed = 42

[otp]
width = 2
depth = 1024

[scrambling]
key_size = 16
keys = [{ name = "SecretKey0", value = "<random>" }]
digests = [{ name = "CnstyDigest" }]

[[partitions]]
name = "HW_CFG"
variant = "buffered"
digest = "hw"
write_lock = "digest"
desc = "Hardware configuration bits."

[[partitions.items]]
name = "DEVICE_ID"
size = 32
inv_default = "0x1234"

[[partitions]]
name = "SECRET0"
variant = "buffered"
secret = true
digest = "hw"
key_sel = "SecretKey0"
size = 40

[[partitions.items]]
name = "TEST_UNLOCK_TOKEN"
size = 16
offset = 0
"#;
        let spec = parse_spec_str(input).expect("should parse");
        assert_eq!(spec.seed, Some(Literal::Integer(42)));
        assert_eq!(spec.otp.width, 2);
        assert_eq!(spec.scrambling.iv_size, 8);
        assert_eq!(spec.scrambling.keys.len(), 1);
        assert!(spec.scrambling.digests[0].iv_value.is_random());
        assert_eq!(spec.partitions.len(), 2);
        assert_eq!(spec.partitions[0].variant, Variant::Buffered);
        assert_eq!(spec.partitions[0].digest, DigestKind::Hw);
        assert_eq!(spec.partitions[0].write_lock, LockKind::Digest);
        assert_eq!(spec.partitions[0].size, None);
        assert_eq!(spec.partitions[1].items[0].offset, Some(0));
        assert_eq!(spec.partitions[1].key_sel.as_deref(), Some("SecretKey0"));
    }

    #[test]
    fn parses_minimal_spec() {
        let input = r"
[otp]
width = 8
depth = 16
";
        let spec = parse_spec_str(input).expect("should parse");
        assert!(spec.seed.is_none());
        assert!(spec.partitions.is_empty());
        assert_eq!(spec.scrambling, ScramblingSection::default());
    }

    #[test]
    fn seed_accepts_string_form() {
        let input = r#"
seed = "18446744073709551615"
[otp]
width = 8
depth = 16
"#;
        let spec = parse_spec_str(input).unwrap();
        assert_eq!(
            spec.seed,
            Some(Literal::Text("18446744073709551615".to_owned()))
        );
    }

    #[test]
    fn rejects_unknown_partition_field() {
        let input = r#"
[otp]
width = 8
depth = 16

[[partitions]]
name = "A"
sise = 64
"#;
        assert!(parse_spec_str(input).is_err());
    }

    #[test]
    fn rejects_unknown_item_field() {
        let input = r#"
[otp]
width = 8
depth = 16

[[partitions]]
name = "A"

[[partitions.items]]
name = "flag"
size = 4
ofset = 0
"#;
        assert!(parse_spec_str(input).is_err());
    }

    #[test]
    fn rejects_unknown_digest_kind() {
        let input = r#"
[otp]
width = 8
depth = 16

[[partitions]]
name = "A"
digest = "sha"
"#;
        assert!(parse_spec_str(input).is_err());
    }

    #[test]
    fn rejects_missing_otp_section() {
        assert!(parse_spec_str("seed = 1\n").is_err());
    }

    #[test]
    fn literal_from_u64_keeps_wide_values_as_text() {
        assert_eq!(Literal::from(7), Literal::Integer(7));
        assert_eq!(
            Literal::from(u64::MAX),
            Literal::Text(u64::MAX.to_string())
        );
    }

    #[test]
    fn parse_spec_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_spec_file(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
