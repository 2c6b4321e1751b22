use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn megabrain_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("megabrain");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/megabrain.sqlite"

[server]
bind = "127.0.0.1:0"
"#,
        root.display(),
    );

    let config_path = config_dir.join("megabrain.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_megabrain(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = megabrain_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run megabrain binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_megabrain(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_megabrain(&config_path, &["init"]);
    assert!(success1, "first init failed");

    let (_, _, success2) = run_megabrain(&config_path, &["init"]);
    assert!(success2, "second init failed (not idempotent)");
}

#[test]
fn test_search_on_empty_index_returns_no_results() {
    let (_tmp, config_path) = setup_test_env();
    run_megabrain(&config_path, &["init"]);

    let (stdout, stderr, success) = run_megabrain(&config_path, &["search", "UserService"]);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.trim().is_empty(), "expected no results, got: {}", stdout);
}

#[test]
fn test_search_rejects_empty_query_text() {
    let (_tmp, config_path) = setup_test_env();
    run_megabrain(&config_path, &["init"]);

    let (_, stderr, success) = run_megabrain(&config_path, &["search", "   "]);
    assert!(!success, "expected search with blank query_text to fail");
    assert!(!stderr.is_empty());
}

#[test]
fn test_ingest_state_show_then_delete() {
    let (_tmp, config_path) = setup_test_env();
    run_megabrain(&config_path, &["init"]);

    let (stdout, _, success) = run_megabrain(&config_path, &["ingest-state", "show", "github.com/acme/widget"]);
    assert!(success);
    assert!(stdout.contains("no index state"));

    let (stdout, _, success) = run_megabrain(&config_path, &["ingest-state", "delete", "github.com/acme/widget"]);
    assert!(success);
    assert!(stdout.contains("no index state"));
}
