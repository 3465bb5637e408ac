//! Markdown documentation tables rendered from the query surface.

use crate::layout::{MapEntryKind, ResolvedLayout};
use std::fmt::Write as _;

/// Prepended to every generated documentation file.
pub const TABLE_HEADER_COMMENT: &str = "<!--
DO NOT EDIT THIS FILE DIRECTLY.
It has been generated with otp-mmap.
-->

";

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Hex digits needed to print any address of the region, at least three.
fn address_digits(total: u64) -> usize {
    let bits = 64 - total.saturating_sub(1).leading_zeros() as usize;
    bits.div_ceil(4).max(3)
}

fn addr(value: u64, digits: usize) -> String {
    format!("0x{value:0digits$X}")
}

pub fn partitions_table(layout: &ResolvedLayout) -> String {
    let digits = address_digits(layout.total_size());
    let mut out = String::from(
        "| Partition | Start | End | Size [B] | Secret | Buffered | Digest | WR Lockable | RD Lockable | Description |\n\
         |:----------|:-----:|:---:|:--------:|:------:|:--------:|:------:|:-----------:|:-----------:|:------------|\n",
    );
    for row in layout.partition_rows() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            row.name,
            addr(row.start, digits),
            addr(row.end, digits),
            row.size,
            yes_no(row.secret),
            yes_no(row.buffered),
            row.digest,
            yes_no(row.write_lockable),
            yes_no(row.read_lockable),
            row.desc.replace('\n', " "),
        );
    }
    out
}

pub fn digests_table(layout: &ResolvedLayout) -> String {
    let digits = address_digits(layout.total_size());
    let mut out = String::from(
        "| Digest Name | Affected Partition | Byte Address | Size [B] | Calculated by HW |\n\
         |:------------|:-------------------|:------------:|:--------:|:----------------:|\n",
    );
    for row in layout.digest_rows() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} |",
            row.name,
            row.partition,
            addr(row.offset, digits),
            row.width,
            yes_no(row.computed_by_hw),
        );
    }
    out
}

pub fn mmap_table(layout: &ResolvedLayout) -> String {
    let digits = address_digits(layout.total_size());
    let mut out = String::from(
        "| Index | Partition | Item | Byte Address | Size [B] | Access Granule |\n\
         |:-----:|:----------|:-----|:------------:|:--------:|:--------------:|\n",
    );
    for entry in layout.address_map() {
        let index = entry
            .partition_index
            .map_or_else(String::new, |i| i.to_string());
        let partition = entry.partition.map_or("", |p| p.as_str());
        let item = match entry.kind {
            MapEntryKind::Partition => "",
            MapEntryKind::Padding => "(padding)",
            MapEntryKind::Item | MapEntryKind::Digest => entry.name.unwrap_or(""),
        };
        let _ = writeln!(
            out,
            "| {index} | {partition} | {item} | {} | {} | {}bit |",
            addr(entry.start, digits),
            entry.size,
            entry.granule,
        );
    }
    out
}
