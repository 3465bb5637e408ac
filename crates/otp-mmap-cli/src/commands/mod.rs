pub mod check;
pub mod completions;
pub mod generate;
pub mod man_pages;
pub mod show;

use otp_mmap_core::{EffectiveSeed, Engine, GenerateOptions, OsEntropy, ResolvedLayout, SeedOrigin};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Run the full pipeline over `spec`, drawing a fresh seed from the OS when
/// neither the file nor `seed_override` provides one.
pub fn resolve_layout(spec: &Path, seed_override: Option<u64>) -> Result<ResolvedLayout, String> {
    debug!("resolving memory map {}", spec.display());
    let layout = Engine::new(GenerateOptions { seed_override })
        .resolve_file(spec, &mut OsEntropy)
        .map_err(|e| e.to_string())?;
    report_seed(layout.seed());
    Ok(layout)
}

fn report_seed(seed: EffectiveSeed) {
    match seed.origin {
        SeedOrigin::Spec => debug!("using seed {} from memory map", seed.value),
        SeedOrigin::Override => warn!("Seed override: setting to {}", seed.value),
        SeedOrigin::Generated => warn!("No seed specified, setting to {}", seed.value),
    }
}

/// Write every `(name, contents)` pair into `dir`.
///
/// All contents are first written and synced to temporary files in `dir`;
/// targets are replaced only once every file is staged, so a failed write
/// leaves the previous output set untouched.
pub fn write_all_atomic(dir: &Path, files: &[(&str, String)]) -> Result<(), String> {
    let mut staged = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        if path.is_dir() {
            return Err(format!("cannot write {}: is a directory", path.display()));
        }
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| format!("failed to create temporary file in {}: {e}", dir.display()))?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| format!("failed to sync {}: {e}", path.display()))?;
        staged.push((tmp, path));
    }
    for (tmp, path) in staged {
        tmp.persist(&path)
            .map_err(|e| format!("failed to persist {}: {}", path.display(), e.error))?;
        debug!("wrote {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"seed": 42});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"seed\""));
        assert!(result.contains("42"));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
    }

    #[test]
    fn write_all_atomic_replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        write_all_atomic(dir.path(), &[("a.md", "first".to_owned())]).unwrap();
        write_all_atomic(
            dir.path(),
            &[("a.md", "second".to_owned()), ("b.md", "other".to_owned())],
        )
        .unwrap();
        let read = |name: &str| std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("a.md"), "second");
        assert_eq!(read("b.md"), "other");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn write_all_atomic_fails_for_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(write_all_atomic(&missing, &[("out.md", "x".to_owned())]).is_err());
    }

    #[test]
    fn write_all_atomic_leaves_earlier_files_untouched_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "old").unwrap();
        std::fs::create_dir(dir.path().join("c.md")).unwrap();
        let err = write_all_atomic(
            dir.path(),
            &[
                ("a.md", "new".to_owned()),
                ("b.md", "new".to_owned()),
                ("c.md", "new".to_owned()),
            ],
        )
        .unwrap_err();
        assert!(err.contains("is a directory"), "{err}");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.md")).unwrap(),
            "old"
        );
        assert!(!dir.path().join("b.md").exists());
        // Only the original file and the blocking directory remain.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn resolve_layout_reports_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mmap.toml");
        std::fs::write(&path, "[otp]\nwidth = 0\ndepth = 4\n").unwrap();
        let err = resolve_layout(&path, None).unwrap_err();
        assert!(err.starts_with("configuration error:"), "{err}");
    }
}
