//! CLI Integration Tests
//!
//! These tests drive the built `cellstat` binary end-to-end against JSON
//! descriptions and bag files written to a temp directory.
//!
//! Run with:
//! ```bash
//! cargo test --test cli_integration
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{tempdir, TempDir};

/// Two identical 5-bit leaves under a 10-bit root
const SHARED_LEAF: &str = r#"{
    "bits": "b:1111111111",
    "refs": [{"bits": "b:10101"}, {"bits": "b:10101"}]
}"#;

fn cellstat_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cellstat"))
}

/// Run cellstat and return (stdout, stderr, success)
fn run_cellstat(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(cellstat_binary())
        .args(args)
        .output()
        .expect("Failed to execute cellstat");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, success) = run_cellstat(args);
    assert!(success, "cellstat {:?} failed: {}", args, stderr);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON {stdout:?}: {e}"))
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Stats
// ============================================================================

#[test]
fn test_cli_stats_deduplicated() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let json = run_json(&["stats", arg(&file)]);

    assert_eq!(json["mode"], "deduplicated");
    assert_eq!(json["stats"]["bits"], "15");
    assert_eq!(json["stats"]["cells"], "2");
    assert_eq!(json["root"].as_str().unwrap().len(), 64);
}

#[test]
fn test_cli_stats_raw() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let json = run_json(&["stats", arg(&file), "--raw"]);

    assert_eq!(json["mode"], "raw");
    assert_eq!(json["stats"]["bits"], "20");
    assert_eq!(json["stats"]["cells"], "3");
}

#[test]
fn test_cli_stats_skip_root() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let json = run_json(&["stats", arg(&file), "--skip-root"]);
    assert_eq!(json["stats"]["bits"], "5");
    assert_eq!(json["stats"]["cells"], "1");

    let empty = write_file(&dir, "empty.json", "{}");
    let json = run_json(&["stats", arg(&empty), "--skip-root", "--raw"]);
    assert_eq!(json["stats"]["bits"], "0");
    assert_eq!(json["stats"]["cells"], "0");
}

#[test]
fn test_cli_stats_text_format() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let (stdout, _stderr, success) = run_cellstat(&["-f", "text", "stats", arg(&file)]);

    assert!(success, "stats should succeed");
    assert_eq!(stdout.trim(), "15 bits and 2 cells");
}

#[test]
fn test_cli_stats_root_out_of_range() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let (_stdout, stderr, success) = run_cellstat(&["stats", arg(&file), "--root", "3"]);

    assert!(!success, "missing root should fail");
    assert!(stderr.contains("out of range"), "stderr: {}", stderr);
}

#[test]
fn test_cli_missing_file_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.cells");

    let (_stdout, stderr, success) = run_cellstat(&["stats", arg(&missing)]);

    assert!(!success);
    assert!(stderr.contains("Failed to read"), "stderr: {}", stderr);
}

#[test]
fn test_cli_invalid_json_fails() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "broken.json", r#"{"bits": "b:102"}"#);

    let (_stdout, _stderr, success) = run_cellstat(&["stats", arg(&file)]);
    assert!(!success, "bad bit literal should fail");
}

#[test]
fn test_cli_empty_root_list_fails() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "empty.json", "[]");

    let (_stdout, stderr, success) = run_cellstat(&["stats", arg(&file)]);

    assert!(!success, "empty root list should fail");
    assert!(stderr.contains("no root cells"), "stderr: {}", stderr);
}

// ============================================================================
// Report
// ============================================================================

#[test]
fn test_cli_report_text_lines() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let (stdout, _stderr, success) = run_cellstat(&["-f", "text", "report", arg(&file)]);

    assert!(success, "report should succeed");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Deduplicated wallet code takes 15 bits and 2 cells",
            "Raw wallet code takes 20 bits and 3 cells",
        ]
    );
}

#[test]
fn test_cli_report_json_with_label() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "wallet.json", SHARED_LEAF);

    let json = run_json(&["report", arg(&file), "--label", "jetton"]);

    assert_eq!(json["label"], "jetton");
    assert_eq!(json["deduplicated"]["cells"], "2");
    assert_eq!(json["raw"]["cells"], "3");
}

// ============================================================================
// Build / Inspect
// ============================================================================

#[test]
fn test_cli_build_then_stats_from_bag() {
    let dir = tempdir().unwrap();
    let source = write_file(&dir, "wallet.json", SHARED_LEAF);
    let bag = dir.path().join("wallet.cells");

    let json = run_json(&["build", arg(&source), "-o", arg(&bag)]);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["cells"], 2);
    assert!(bag.exists(), "bag file should be written");

    let bytes = std::fs::read(&bag).unwrap();
    assert_eq!(&bytes[..8], b"CELLSTAT");

    let from_json = run_json(&["stats", arg(&source), "--raw"]);
    let from_bag = run_json(&["stats", arg(&bag), "--raw"]);
    assert_eq!(from_json, from_bag);
}

#[test]
fn test_cli_inspect() {
    let dir = tempdir().unwrap();
    let file = write_file(&dir, "roots.json", &format!("[{SHARED_LEAF}, {{\"bits\": \"ff\"}}]"));

    let json = run_json(&["inspect", arg(&file)]);

    let roots = json["roots"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["bits"], 10);
    assert_eq!(roots[0]["refs"], 2);
    assert_eq!(roots[0]["depth"], 1);
    assert_eq!(roots[1]["depth"], 0);
    assert_eq!(json["distinct_cells"], 3);
}

// ============================================================================
// Sum
// ============================================================================

#[test]
fn test_cli_sum_shares_visited_across_files() {
    let dir = tempdir().unwrap();
    let a = write_file(&dir, "a.json", SHARED_LEAF);
    let b = write_file(&dir, "b.json", r#"{"bits": "b:1", "refs": [{"bits": "b:10101"}]}"#);

    let dedup = run_json(&["sum", arg(&a), arg(&b)]);
    // b's leaf was already counted through a
    assert_eq!(dedup["stats"]["bits"], "16");
    assert_eq!(dedup["stats"]["cells"], "3");
    assert_eq!(dedup["roots"], 2);

    let raw = run_json(&["sum", arg(&a), arg(&b), "--raw"]);
    assert_eq!(raw["stats"]["bits"], "26");
    assert_eq!(raw["stats"]["cells"], "5");

    let twice = run_json(&["sum", arg(&a), arg(&a)]);
    assert_eq!(twice["stats"]["cells"], "2");
}

#[test]
fn test_cli_sum_requires_files() {
    let (_stdout, _stderr, success) = run_cellstat(&["sum"]);
    assert!(!success, "sum without files should fail");
}
