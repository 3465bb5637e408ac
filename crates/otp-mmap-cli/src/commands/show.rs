use super::{json_pretty, resolve_layout, EXIT_SUCCESS};
use clap::ValueEnum;
use otp_mmap_core::{digests_table, mmap_table, partitions_table};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Table {
    Partitions,
    Digests,
    Mmap,
}

pub fn run(spec: &Path, seed: Option<u64>, table: Table, json: bool) -> Result<u8, String> {
    let layout = resolve_layout(spec, seed)?;
    if json {
        let rows = match table {
            Table::Partitions => json_pretty(&layout.partition_rows())?,
            Table::Digests => json_pretty(&layout.digest_rows())?,
            Table::Mmap => json_pretty(&layout.address_map())?,
        };
        println!("{rows}");
    } else {
        let rendered = match table {
            Table::Partitions => partitions_table(&layout),
            Table::Digests => digests_table(&layout),
            Table::Mmap => mmap_table(&layout),
        };
        print!("{rendered}");
    }
    Ok(EXIT_SUCCESS)
}
