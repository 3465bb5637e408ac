use super::{json_pretty, EXIT_SUCCESS};
use otp_mmap_core::Engine;
use otp_mmap_schema::parse_spec_file;
use std::path::Path;

pub fn run(spec: &Path, json: bool) -> Result<u8, String> {
    let memory = parse_spec_file(spec)
        .and_then(|raw| raw.normalize())
        .map_err(|e| format!("configuration error: {e}"))?;
    let allocation = Engine::default()
        .check(&memory)
        .map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "ok": true,
            "partitions": allocation.partitions.len(),
            "used_size": allocation.end,
            "total_size": memory.total_size(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "ok: {} partitions, {} of {} bytes used",
            allocation.partitions.len(),
            allocation.end,
            memory.total_size()
        );
    }
    Ok(EXIT_SUCCESS)
}
