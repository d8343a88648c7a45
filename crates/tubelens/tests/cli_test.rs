//! CLI integration tests for the tubelens command-line interface.
//!
//! These run the binary with an isolated config directory and working
//! directory; none of them reach the network.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A tubelens command isolated to `dir`.
fn tubelens(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tubelens").unwrap();
    cmd.current_dir(dir.path())
        .env("TUBELENS_CONFIG_DIR", dir.path().join("config"))
        .env_remove("GEMINI_API_KEY")
        .env_remove("YOUTUBE_API_KEY")
        .env_remove("SUPADATA_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("matches"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tubelens"));
}

#[test]
fn test_run_help_shows_flags() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mode"))
        .stdout(predicate::str::contains("--fixture"))
        .stdout(predicate::str::contains("--out-dir"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_uses_config_dir_env() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml (not found)"))
        .stdout(predicate::str::contains("tubelens.toml (not found)"));
}

#[test]
fn test_config_show_redacts_keys() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("config/config.toml"),
        "[llm]\napi_key = \"very-secret\"\n\n[pipeline]\nsimilarity_k = 4\n",
    );

    tubelens(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("similarity_k = 4"))
        .stdout(predicate::str::contains("[REDACTED]"))
        .stdout(predicate::str::contains("very-secret").not())
        .stdout(predicate::str::contains("missing (set YOUTUBE_API_KEY)"));
}

#[test]
fn test_project_config_overrides_user_config() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("config/config.toml"),
        "[pipeline]\nsimilarity_k = 4\n",
    );
    write(&dir.path().join("tubelens.toml"), "[pipeline]\nsimilarity_k = 9\n");

    tubelens(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("similarity_k = 9"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Run and Matches
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_run_rejects_invalid_video_id() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["run", "https://example.com/not-a-video"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to extract a video id"));
}

#[test]
fn test_run_rejects_unknown_mode() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["run", "Lfr2KvIS2nY", "--mode", "summary"])
        .assert()
        .failure();
}

#[test]
fn test_run_with_missing_fixture_fails() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["run", "Lfr2KvIS2nY", "--fixture", "missing.json", "--db", "store.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read fixture"));
}

#[test]
fn test_run_without_gemini_key_fails() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("video.json"),
        r#"{"videoId": "Lfr2KvIS2nY", "title": "t", "transcript": "hello"}"#,
    );

    tubelens(&dir)
        .args(["run", "Lfr2KvIS2nY", "--fixture", "video.json", "--db", "store.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_matches_without_store_fails() {
    let dir = TempDir::new().unwrap();
    tubelens(&dir)
        .args(["matches", "Lfr2KvIS2nY", "--db", "absent.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no store at"));
}

#[test]
fn test_matches_on_empty_store_prints_empty_list() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    drop(tubelens_store::Database::open(&db, tubelens_types::EMBEDDING_DIMS).unwrap());

    tubelens(&dir)
        .args(["matches", "https://www.youtube.com/watch?v=Lfr2KvIS2nY", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}
