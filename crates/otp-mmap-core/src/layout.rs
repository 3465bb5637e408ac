use crate::allocate::{Allocation, ItemLayout, PartitionLayout, Region};
use crate::constants::{generate_constants, Constant, ConstantSet};
use crate::seed::{EffectiveSeed, SeedOrigin};
use crate::LayoutError;
use otp_mmap_schema::{DigestKind, ItemName, MemorySpec, Partition, PartitionName, Variant};
use serde::Serialize;

/// Fully computed, immutable memory map.
///
/// Produced once per pipeline run. Re-deriving with a different seed yields a
/// new value through [`ResolvedLayout::reseed`]; nothing here is mutable. The
/// serialized form is the context handed to template renderers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedLayout {
    spec: MemorySpec,
    seed: EffectiveSeed,
    partitions: Vec<PartitionLayout>,
    gaps: Vec<Region>,
    used_size: u64,
    constants: ConstantSet,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PartitionRow<'a> {
    pub index: usize,
    pub name: &'a PartitionName,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    pub secret: bool,
    pub variant: Variant,
    pub buffered: bool,
    pub write_lockable: bool,
    pub read_lockable: bool,
    pub digest: DigestKind,
    pub desc: &'a str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DigestRow<'a> {
    pub name: &'a ItemName,
    pub partition: &'a PartitionName,
    pub offset: u64,
    pub width: u64,
    pub computed_by_hw: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MapEntryKind {
    Partition,
    Item,
    Padding,
    Digest,
}

/// One row of the full address map.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MapEntry<'a> {
    pub kind: MapEntryKind,
    /// Index of the owning partition; `None` for gaps between partitions.
    pub partition_index: Option<usize>,
    pub partition: Option<&'a PartitionName>,
    /// Item or digest name; `None` for partition and padding rows.
    pub name: Option<&'a str>,
    pub start: u64,
    pub end: u64,
    pub size: u64,
    /// Access granule in bits.
    pub granule: u64,
}

impl ResolvedLayout {
    pub(crate) fn new(
        spec: &MemorySpec,
        seed: EffectiveSeed,
        allocation: Allocation,
        constants: ConstantSet,
    ) -> Self {
        Self {
            spec: spec.with_seed(seed.value),
            seed,
            partitions: allocation.partitions,
            gaps: allocation.gaps,
            used_size: allocation.end,
            constants,
        }
    }

    /// Same placement, constants re-derived from `seed`.
    pub fn reseed(&self, seed: u64) -> Result<ResolvedLayout, LayoutError> {
        let constants = generate_constants(&self.spec, seed)?;
        Ok(ResolvedLayout {
            spec: self.spec.with_seed(seed),
            seed: EffectiveSeed {
                value: seed,
                origin: SeedOrigin::Override,
            },
            constants,
            ..self.clone()
        })
    }

    /// Specification with the realized seed recorded in it.
    pub fn spec(&self) -> &MemorySpec {
        &self.spec
    }

    pub fn seed(&self) -> EffectiveSeed {
        self.seed
    }

    pub fn total_size(&self) -> u64 {
        self.spec.total_size()
    }

    /// First byte after the last partition.
    pub fn used_size(&self) -> u64 {
        self.used_size
    }

    pub fn partitions(&self) -> &[PartitionLayout] {
        &self.partitions
    }

    /// Alignment gaps between partitions.
    pub fn gaps(&self) -> &[Region] {
        &self.gaps
    }

    pub fn constants(&self) -> &ConstantSet {
        &self.constants
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name)
    }

    pub fn partition(&self, name: &str) -> Option<&PartitionLayout> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn item(&self, name: &str) -> Option<&ItemLayout> {
        self.partitions
            .iter()
            .flat_map(|p| p.items.iter())
            .find(|i| i.name == name)
    }

    fn declared(&self) -> impl Iterator<Item = (usize, &Partition, &PartitionLayout)> {
        self.spec
            .partitions
            .iter()
            .zip(&self.partitions)
            .enumerate()
            .map(|(idx, (spec, layout))| (idx, spec, layout))
    }

    pub fn partition_rows(&self) -> Vec<PartitionRow<'_>> {
        self.declared()
            .map(|(index, spec, layout)| PartitionRow {
                index,
                name: &layout.name,
                start: layout.start,
                end: layout.end,
                size: layout.size(),
                secret: spec.secret,
                variant: spec.variant,
                buffered: spec.variant != Variant::Unbuffered,
                write_lockable: spec.write_lock.is_lockable(),
                read_lockable: spec.read_lock.is_lockable(),
                digest: spec.digest,
                desc: &spec.desc,
            })
            .collect()
    }

    pub fn digest_rows(&self) -> Vec<DigestRow<'_>> {
        self.partitions
            .iter()
            .filter_map(|layout| {
                layout.digest.as_ref().map(|slot| DigestRow {
                    name: &slot.name,
                    partition: &layout.name,
                    offset: slot.offset,
                    width: slot.width,
                    computed_by_hw: slot.computed_by_hw(),
                })
            })
            .collect()
    }

    /// Every partition, item, padding region and digest slot in address order.
    pub fn address_map(&self) -> Vec<MapEntry<'_>> {
        let mut out = Vec::new();
        let mut gaps = self.gaps.iter().peekable();

        for (index, spec, layout) in self.declared() {
            while let Some(gap) = gaps.next_if(|g| g.end <= layout.start) {
                out.push(MapEntry {
                    kind: MapEntryKind::Padding,
                    partition_index: None,
                    partition: None,
                    name: None,
                    start: gap.start,
                    end: gap.end,
                    size: gap.size(),
                    granule: 32,
                });
            }

            let granule = if spec.secret { 64 } else { 32 };
            out.push(MapEntry {
                kind: MapEntryKind::Partition,
                partition_index: Some(index),
                partition: Some(&layout.name),
                name: None,
                start: layout.start,
                end: layout.end,
                size: layout.size(),
                granule,
            });

            let mut inner: Vec<MapEntry<'_>> = layout
                .items
                .iter()
                .map(|item| MapEntry {
                    kind: MapEntryKind::Item,
                    partition_index: Some(index),
                    partition: Some(&layout.name),
                    name: Some(item.name.as_str()),
                    start: item.offset,
                    end: item.end(),
                    size: item.size,
                    granule,
                })
                .chain(layout.padding.iter().map(|pad| MapEntry {
                    kind: MapEntryKind::Padding,
                    partition_index: Some(index),
                    partition: Some(&layout.name),
                    name: None,
                    start: pad.start,
                    end: pad.end,
                    size: pad.size(),
                    granule,
                }))
                .chain(layout.digest.iter().map(|slot| MapEntry {
                    kind: MapEntryKind::Digest,
                    partition_index: Some(index),
                    partition: Some(&layout.name),
                    name: Some(slot.name.as_str()),
                    start: slot.offset,
                    end: slot.end(),
                    size: slot.width,
                    granule: 64,
                }))
                .collect();
            inner.sort_by_key(|entry| entry.start);
            out.extend(inner);
        }
        out
    }

    /// Blake3 hash over the canonical JSON form; equal layouts hash equal.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Template context: the serialized layout plus the derived rows.
    pub fn template_context(&self) -> serde_json::Value {
        serde_json::json!({
            "layout": self,
            "partition_rows": self.partition_rows(),
            "digest_rows": self.digest_rows(),
            "address_map": self.address_map(),
        })
    }
}
