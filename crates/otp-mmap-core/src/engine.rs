use crate::allocate::{allocate, Allocation};
use crate::constants::generate_constants;
use crate::layout::ResolvedLayout;
use crate::seed::{resolve_seed, SeedSource};
use crate::validate::validate;
use crate::CoreError;
use otp_mmap_schema::{parse_spec_file, parse_spec_str, MemorySpec};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Seed that takes precedence over the specification's own.
    pub seed_override: Option<u64>,
}

/// Layout pipeline: seed resolution, validation, allocation with digest
/// placement, constant generation.
///
/// Every stage runs to completion or the whole run fails; no partial layout
/// is ever returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    options: GenerateOptions,
}

impl Engine {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Validate and allocate without touching the seed.
    pub fn check(&self, spec: &MemorySpec) -> Result<Allocation, CoreError> {
        validate(spec)?;
        Ok(allocate(spec)?)
    }

    pub fn resolve(
        &self,
        spec: &MemorySpec,
        source: &mut dyn SeedSource,
    ) -> Result<ResolvedLayout, CoreError> {
        let seed = resolve_seed(spec.seed.as_ref(), self.options.seed_override, source)?;
        let allocation = self.check(spec)?;
        let constants = generate_constants(spec, seed.value)?;
        Ok(ResolvedLayout::new(spec, seed, allocation, constants))
    }

    /// Parse, normalize, and resolve a TOML specification.
    pub fn resolve_str(
        &self,
        input: &str,
        source: &mut dyn SeedSource,
    ) -> Result<ResolvedLayout, CoreError> {
        let spec = parse_spec_str(input)?.normalize()?;
        self.resolve(&spec, source)
    }

    pub fn resolve_file(
        &self,
        path: &Path,
        source: &mut dyn SeedSource,
    ) -> Result<ResolvedLayout, CoreError> {
        let spec = parse_spec_file(path)?.normalize()?;
        self.resolve(&spec, source)
    }
}
