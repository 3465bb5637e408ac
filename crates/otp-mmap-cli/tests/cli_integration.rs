//! CLI subprocess integration tests.
//!
//! These tests invoke the `otp-mmap` binary as a subprocess and verify
//! exit codes, generated files, and JSON output stability.

use std::path::{Path, PathBuf};
use std::process::Command;

fn otp_mmap_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_otp-mmap"));
    cmd.env_remove("OTP_MMAP_LOG");
    cmd
}

fn demo_spec() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/otp_ctrl_mmap.toml")
}

fn write_spec(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("otp_ctrl_mmap.toml");
    std::fs::write(&path, body).unwrap();
    path
}

const SMALL_SPEC: &str = r#"
[otp]
width = 8
depth = 16

[[partitions]]
name = "A"
size = 64
[[partitions.items]]
name = "flag"
size = 4
inv_default = "<random>"

[[partitions]]
name = "B"
size = 32
variant = "buffered"
digest = "hw"
[[partitions.items]]
name = "key"
size = 16
inv_default = "<random>"
"#;

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}): {stdout}"))
}

#[test]
fn cli_version_exits_zero() {
    let output = otp_mmap_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "otp-mmap --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("otp-mmap"), "version output: {stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let output = otp_mmap_bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["generate", "check", "show", "completions", "man-pages"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_unknown_command_fails() {
    let output = otp_mmap_bin().arg("frobnicate").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_check_demo_spec() {
    let output = otp_mmap_bin()
        .args(["--json", "check"])
        .arg(demo_spec())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = json_stdout(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["partitions"], 8);
    assert_eq!(json["used_size"], 1984);
    assert_eq!(json["total_size"], 2048);
}

#[test]
fn cli_generate_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let output = otp_mmap_bin()
        .arg("generate")
        .arg(demo_spec())
        .arg("--out-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("seed: 10556718629619452145"), "{stdout}");
    assert!(stdout.contains("fingerprint: "));

    for name in [
        "otp_ctrl_partitions.md",
        "otp_ctrl_digests.md",
        "otp_ctrl_mmap.md",
    ] {
        let contents = std::fs::read_to_string(out.join(name)).unwrap();
        assert!(contents.starts_with("<!--\nDO NOT EDIT THIS FILE DIRECTLY."));
    }
    let mmap = std::fs::read_to_string(out.join("otp_ctrl_mmap.md")).unwrap();
    assert!(mmap.contains("SECRET2_DIGEST"));

    let context: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("otp_mmap.json")).unwrap())
            .unwrap();
    assert!(context["partition_rows"].is_array());
    assert!(context["address_map"].is_array());
    assert_eq!(context["layout"]["seed"]["origin"], "spec");
}

#[test]
fn cli_generate_is_deterministic_for_seed() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), SMALL_SPEC);
    let run = |sub: &str| {
        let out = dir.path().join(sub);
        let output = otp_mmap_bin()
            .args(["--json", "generate"])
            .arg(&spec)
            .args(["--seed", "42", "--out-dir"])
            .arg(&out)
            .output()
            .unwrap();
        assert!(output.status.success());
        let json = json_stdout(&output);
        let context = std::fs::read_to_string(out.join("otp_mmap.json")).unwrap();
        (json, context)
    };
    let (first, first_context) = run("a");
    let (second, second_context) = run("b");
    assert_eq!(first["seed"], 42);
    assert_eq!(first["seed_origin"], "override");
    assert_eq!(first["fingerprint"], second["fingerprint"]);
    assert_eq!(first_context, second_context);
}

#[test]
fn cli_generated_seed_is_logged_and_replayable() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), SMALL_SPEC);
    let output = otp_mmap_bin()
        .args(["--json", "generate"])
        .arg(&spec)
        .arg("--out-dir")
        .arg(dir.path().join("a"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No seed specified, setting to"), "{stderr}");
    let first = json_stdout(&output);
    assert_eq!(first["seed_origin"], "generated");

    let seed = first["seed"].as_u64().unwrap().to_string();
    let output = otp_mmap_bin()
        .args(["--json", "generate"])
        .arg(&spec)
        .args(["--seed", &seed, "--out-dir"])
        .arg(dir.path().join("b"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Seed override: setting to"), "{stderr}");

    let constants = |sub: &str| {
        let text = std::fs::read_to_string(dir.path().join(sub).join("otp_mmap.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["layout"]["constants"].clone()
    };
    assert_eq!(constants("a"), constants("b"));
}

#[test]
fn cli_show_mmap_table() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), SMALL_SPEC);
    let output = otp_mmap_bin()
        .arg("show")
        .arg(&spec)
        .args(["--seed", "1", "--table", "mmap"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("| 1 | B | key | 0x040 | 16 | 32bit |"), "{stdout}");
    assert!(stdout.contains("| 1 | B | (padding) | 0x050 | 8 | 32bit |"));
    assert!(stdout.contains("| 1 | B | B_DIGEST | 0x058 | 8 | 64bit |"));
}

#[test]
fn cli_show_digests_json() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), SMALL_SPEC);
    let output = otp_mmap_bin()
        .args(["--json", "show"])
        .arg(&spec)
        .args(["--seed", "1", "--table", "digests"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows = json_stdout(&output);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "B_DIGEST");
    assert_eq!(rows[0]["offset"], 88);
}

#[test]
fn cli_config_error_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), "[otp]\nwidth = 8\ndepth = 16\nbogus = 1\n");
    let output = otp_mmap_bin().arg("check").arg(&spec).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: configuration error:"), "{stderr}");
}

#[test]
fn cli_missing_spec_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = otp_mmap_bin()
        .arg("check")
        .arg(dir.path().join("missing.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_layout_error_exits_one_without_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), &SMALL_SPEC.replace("size = 64", "size = 104"));
    let out = dir.path().join("out");
    let output = otp_mmap_bin()
        .arg("generate")
        .arg(&spec)
        .args(["--seed", "1", "--out-dir"])
        .arg(&out)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: layout error:"), "{stderr}");
    assert!(!out.exists(), "no output may be written on failure");
}

#[test]
fn cli_completions_bash() {
    let output = otp_mmap_bin().args(["completions", "bash"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("otp-mmap"));
}

#[test]
fn cli_man_pages_written() {
    let dir = tempfile::tempdir().unwrap();
    let man = dir.path().join("man");
    let output = otp_mmap_bin().arg("man-pages").arg(&man).output().unwrap();
    assert!(output.status.success());
    assert!(man.join("otp-mmap.1").exists());
    assert!(man.join("otp-mmap-generate.1").exists());
}

#[test]
fn cli_generate_unknown_partition_field_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(
        dir.path(),
        "[otp]\nwidth = 8\ndepth = 16\n[[partitions]]\nname = \"A\"\nsise = 8\n",
    );
    let out = dir.path().join("out");
    let output = otp_mmap_bin()
        .arg("generate")
        .arg(&spec)
        .arg("--out-dir")
        .arg(&out)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: configuration error:"), "{stderr}");
    assert!(!out.exists());
}

#[test]
fn cli_generate_failed_write_keeps_previous_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let spec = write_spec(dir.path(), SMALL_SPEC);
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    std::fs::write(out.join("otp_ctrl_partitions.md"), "previous").unwrap();
    std::fs::create_dir(out.join("otp_mmap.json")).unwrap();

    let output = otp_mmap_bin()
        .arg("generate")
        .arg(&spec)
        .args(["--seed", "1", "--out-dir"])
        .arg(&out)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        std::fs::read_to_string(out.join("otp_ctrl_partitions.md")).unwrap(),
        "previous"
    );
    assert!(!out.join("otp_ctrl_digests.md").exists());
    assert!(!out.join("otp_ctrl_mmap.md").exists());
}
