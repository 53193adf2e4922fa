//! End-to-end smoke tests for the `stride` binary.
//!
//! Stdout is not a TTY under the test harness, so every command emits
//! JSON; assertions parse that instead of scraping human output.

use assert_cmd::Command;
use tempfile::TempDir;

fn stride(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("stride").unwrap();
    cmd.env("STRIDE_DB", db);
    cmd.env_remove("STRIDE_TEST_DB");
    cmd
}

fn init_db() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("stride.db");
    stride(&db).arg("init").assert().success();
    (dir, db)
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).unwrap()
}

#[test]
fn test_commands_require_init() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("missing.db");

    let output = stride(&db).args(["task", "list"]).assert().code(2);
    let err: serde_json::Value =
        serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn test_init_twice_needs_force() {
    let (_dir, db) = init_db();
    stride(&db).arg("init").assert().code(2);
    stride(&db).args(["init", "--force"]).assert().success();
}

#[test]
fn test_task_lifecycle() {
    let (_dir, db) = init_db();

    stride(&db)
        .args(["tag", "add", "Home", "--color", "#22AA44"])
        .assert()
        .success();

    let output = stride(&db)
        .args(["task", "add", "Water plants", "--tag", "Home", "--every", "weekly"])
        .assert()
        .success();
    let task = stdout_json(&output.get_output().stdout);
    assert_eq!(task["title"], "Water plants");
    assert_eq!(task["tags"][0], "Home");
    let id = task["id"].as_str().unwrap().to_string();

    let output = stride(&db).args(["task", "list"]).assert().success();
    let tasks = stdout_json(&output.get_output().stdout);
    assert_eq!(tasks.as_array().unwrap().len(), 1);

    // Completing awards exp and bumps the streak.
    let output = stride(&db).args(["task", "done", &id]).assert().success();
    let done = stdout_json(&output.get_output().stdout);
    assert_eq!(done["exp_awarded"], 10);
    assert_eq!(done["streak"], 1);

    let output = stride(&db).arg("progress").assert().success();
    let progress = stdout_json(&output.get_output().stdout);
    assert_eq!(progress["exp"], 10);
    assert!(progress["achievements"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a == "first_task"));
}

#[test]
fn test_unknown_tag_is_rejected() {
    let (_dir, db) = init_db();
    let output = stride(&db)
        .args(["task", "add", "Orphan", "--tag", "nope"])
        .assert()
        .code(3);
    let err: serde_json::Value =
        serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "TAG_NOT_FOUND");
}

#[test]
fn test_deleted_milestone_leaves_pending_delete() {
    let (_dir, db) = init_db();

    let output = stride(&db)
        .args(["milestone", "add", "Ship v1"])
        .assert()
        .success();
    let milestone = stdout_json(&output.get_output().stdout);
    let id = milestone["id"].as_str().unwrap().to_string();

    stride(&db)
        .args(["milestone", "item", "add", &id, "Write changelog"])
        .assert()
        .success();
    stride(&db).args(["milestone", "rm", &id]).assert().success();

    let output = stride(&db).args(["sync", "status"]).assert().success();
    let status = stdout_json(&output.get_output().stdout);
    assert_eq!(status["remote_configured"], false);
    let pending = status["pending_deletes"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["table"], "milestones");
}

#[test]
fn test_sync_run_without_config_fails_cleanly() {
    let (_dir, db) = init_db();
    let output = stride(&db)
        .env_remove("STRIDE_SYNC_URL")
        .args(["sync", "run"])
        .assert()
        .code(7);
    let err: serde_json::Value =
        serde_json::from_slice(&output.get_output().stderr).unwrap();
    assert_eq!(err["error"]["code"], "CONFIG_ERROR");
}
