use super::{json_pretty, resolve_layout, write_all_atomic, EXIT_SUCCESS};
use otp_mmap_core::{digests_table, mmap_table, partitions_table, TABLE_HEADER_COMMENT};
use std::path::Path;
use tracing::info;

pub const PARTITIONS_FILE: &str = "otp_ctrl_partitions.md";
pub const DIGESTS_FILE: &str = "otp_ctrl_digests.md";
pub const MMAP_FILE: &str = "otp_ctrl_mmap.md";
pub const CONTEXT_FILE: &str = "otp_mmap.json";

pub fn run(spec: &Path, seed: Option<u64>, out_dir: &Path, json: bool) -> Result<u8, String> {
    let layout = resolve_layout(spec, seed)?;
    let fingerprint = layout
        .fingerprint()
        .map_err(|e| format!("JSON serialization failed: {e}"))?;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("failed to create {}: {e}", out_dir.display()))?;

    let header = |table: String| format!("{TABLE_HEADER_COMMENT}{table}");
    let files = [
        (PARTITIONS_FILE, header(partitions_table(&layout))),
        (DIGESTS_FILE, header(digests_table(&layout))),
        (MMAP_FILE, header(mmap_table(&layout))),
        (CONTEXT_FILE, json_pretty(&layout.template_context())?),
    ];
    write_all_atomic(out_dir, &files)?;
    info!("wrote {} files to {}", files.len(), out_dir.display());

    if json {
        let payload = serde_json::json!({
            "seed": layout.seed().value,
            "seed_origin": layout.seed().origin,
            "fingerprint": fingerprint,
            "used_size": layout.used_size(),
            "total_size": layout.total_size(),
            "files": [PARTITIONS_FILE, DIGESTS_FILE, MMAP_FILE, CONTEXT_FILE],
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "generated {} partitions ({} of {} bytes used)",
            layout.partitions().len(),
            layout.used_size(),
            layout.total_size()
        );
        println!("seed: {}", layout.seed().value);
        println!("fingerprint: {fingerprint}");
    }
    Ok(EXIT_SUCCESS)
}
