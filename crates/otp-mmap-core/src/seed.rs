//! Effective seed resolution.
//!
//! The seed is resolved once, at pipeline entry, and threaded through as a
//! value. Nothing downstream reads ambient random state.

use crate::SeedError;
use otp_mmap_schema::Literal;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

/// Supplier of a fresh seed when neither the specification nor the caller
/// provides one.
pub trait SeedSource {
    fn draw(&mut self) -> u64;
}

/// Draws seeds from the operating system's entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl SeedSource for OsEntropy {
    fn draw(&mut self) -> u64 {
        OsRng.next_u64()
    }
}

/// Always yields the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSeed(pub u64);

impl SeedSource for FixedSeed {
    fn draw(&mut self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeedOrigin {
    /// Taken from the specification.
    Spec,
    /// Caller override, which always wins over the specification.
    Override,
    /// Freshly drawn because no seed was given anywhere.
    Generated,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EffectiveSeed {
    pub value: u64,
    pub origin: SeedOrigin,
}

/// Parse a seed literal: a non-negative TOML integer, or a decimal or
/// `0x`-prefixed hex string.
pub fn parse_seed(literal: &Literal) -> Result<u64, SeedError> {
    match literal {
        Literal::Integer(v) => u64::try_from(*v).map_err(|_| SeedError::Negative(*v)),
        Literal::Text(text) => {
            let trimmed = text.trim().replace('_', "");
            let parsed = match trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
            {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => trimmed.parse(),
            };
            parsed.map_err(|_| SeedError::Malformed(text.clone()))
        }
    }
}

/// Resolve the seed used for constant generation.
///
/// The specification seed is parsed even when overridden, so a malformed
/// value never goes unnoticed.
pub fn resolve_seed(
    spec_seed: Option<&Literal>,
    override_seed: Option<u64>,
    source: &mut dyn SeedSource,
) -> Result<EffectiveSeed, SeedError> {
    let from_spec = spec_seed.map(parse_seed).transpose()?;
    let seed = match (override_seed, from_spec) {
        (Some(value), _) => EffectiveSeed {
            value,
            origin: SeedOrigin::Override,
        },
        (None, Some(value)) => EffectiveSeed {
            value,
            origin: SeedOrigin::Spec,
        },
        (None, None) => EffectiveSeed {
            value: source.draw(),
            origin: SeedOrigin::Generated,
        },
    };
    Ok(seed)
}
