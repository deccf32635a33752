//! End-to-end workflows: create, inspect, complete and delete nodes.
//!
//! Each test runs the `trellis` binary against its own database in a
//! temporary directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Command for the `trellis` binary using a database inside `dir`.
fn trellis(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("trellis"));
    cmd.current_dir(dir);
    cmd.env("TRELLIS_DB", dir.join("graph.db"));
    // Keep the user's config.toml out of the picture.
    cmd.env("XDG_CONFIG_HOME", dir.join("config"));
    cmd.env("TRELLIS_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn json(dir: &Path, args: &[&str]) -> Value {
    let output = trellis(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("trellis should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON")
}

fn add_root(dir: &Path, name: &str) -> i64 {
    json(dir, &["add", "-r", name])["id"]
        .as_i64()
        .expect("id field")
}

fn add_child(dir: &Path, parent: i64, name: &str) -> i64 {
    json(dir, &["add", "-p", &parent.to_string(), name])["id"]
        .as_i64()
        .expect("id field")
}

fn status(dir: &Path, id: i64) -> String {
    json(dir, &["stat", &id.to_string()])["status"]
        .as_str()
        .expect("status field")
        .to_string()
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn add_and_tree_render_hierarchy() {
    let dir = TempDir::new().expect("tempdir");
    let house = add_root(dir.path(), "Clean up the house");
    let bedroom = add_child(dir.path(), house, "Clean up the bedroom");
    add_child(dir.path(), bedroom, "Make the bed");
    add_child(dir.path(), house, "Clean up the kitchen");

    trellis(dir.path())
        .args(["tree", &house.to_string()])
        .assert()
        .success()
        .stdout(
            "[ ] Clean up the house (1)\n \
             ├──[ ] Clean up the bedroom (2)\n \
             │   └──[ ] Make the bed (3)\n \
             └──[ ] Clean up the kitchen (4)\n",
        );
}

#[test]
fn add_prints_parent_and_id() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .args(["add", "-r", "Home"])
        .assert()
        .success()
        .stdout("(1)\n");
    trellis(dir.path())
        .args(["add", "-p", "1", "Paint", "the", "fence"])
        .assert()
        .success()
        .stdout("(1) -> (2)\n");

    let tree = json(dir.path(), &["tree", "1"]);
    assert_eq!(tree["children"][0]["name"], "Paint the fence");
}

#[test]
fn add_defaults_to_todays_date_node() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path()).args(["add", "Buy", "milk"]).assert().success();

    trellis(dir.path())
        .arg("lsd")
        .assert()
        .success()
        .stdout(predicate::str::contains(today()));
    // Date nodes are not listed among roots.
    trellis(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    // No subcommand prints today's tree.
    trellis(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Buy milk (2)"));
}

#[test]
fn empty_today_prints_unsaved_date() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .assert()
        .success()
        .stdout(format!("[ ] {}\n", today()));
}

#[test]
fn checking_children_completes_parent() {
    let dir = TempDir::new().expect("tempdir");
    let root = add_root(dir.path(), "project");
    let a = add_child(dir.path(), root, "a");
    let b = add_child(dir.path(), root, "b");

    trellis(dir.path())
        .args(["check", &a.to_string()])
        .assert()
        .success();
    assert_eq!(status(dir.path(), root), "in_progress");

    trellis(dir.path())
        .args(["check", &b.to_string()])
        .assert()
        .success();
    assert_eq!(status(dir.path(), root), "completed");

    trellis(dir.path())
        .args(["uncheck", &a.to_string()])
        .assert()
        .success();
    assert_eq!(status(dir.path(), root), "in_progress");
    assert_eq!(status(dir.path(), a), "inactive");
}

#[test]
fn check_reports_missing_nodes_but_checks_the_rest() {
    let dir = TempDir::new().expect("tempdir");
    let root = add_root(dir.path(), "project");

    trellis(dir.path())
        .args(["check", "99", &root.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
    assert_eq!(status(dir.path(), root), "completed");
}

#[test]
fn stat_shows_neighbourhood_and_progress() {
    let dir = TempDir::new().expect("tempdir");
    let root = add_root(dir.path(), "project");
    let a = add_child(dir.path(), root, "a");
    add_child(dir.path(), root, "b");
    trellis(dir.path())
        .args(["check", &a.to_string()])
        .assert()
        .success();

    trellis(dir.path())
        .args(["stat", &root.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1) ───┬─── (2)"))
        .stdout(predicate::str::contains("Status:    in progress (1/2)"))
        .stdout(predicate::str::contains("Children:  2"));

    let stat = json(dir.path(), &["stat", &root.to_string()]);
    assert_eq!(stat["children"], serde_json::json!([2, 3]));
    assert_eq!(stat["leaves_done"], 1);
    assert_eq!(stat["leaves_total"], 2);
}

#[test]
fn remove_orphans_children() {
    let dir = TempDir::new().expect("tempdir");
    let root = add_root(dir.path(), "project");
    add_child(dir.path(), root, "step");

    trellis(dir.path())
        .args(["rm", "-v", &root.to_string()])
        .assert()
        .success()
        .stdout("Removed: [ ] project (1)\nOrphaned: [ ] step (2)\n");

    trellis(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout("[ ] step (2)\n");
}

#[test]
fn remove_recursive_keeps_shared_descendants() {
    let dir = TempDir::new().expect("tempdir");
    let a = add_root(dir.path(), "a");
    let shared = add_child(dir.path(), a, "shared");
    let own = add_child(dir.path(), a, "own");
    let other = add_root(dir.path(), "other");
    trellis(dir.path())
        .args(["link", &other.to_string(), &shared.to_string()])
        .assert()
        .success();

    let removal = json(dir.path(), &["rm", "-r", &a.to_string()]);
    let removed: Vec<i64> = removal[0]["removed"]
        .as_array()
        .expect("removed")
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect();
    assert_eq!(removed, vec![a, own]);

    let tree = json(dir.path(), &["tree", &other.to_string()]);
    assert_eq!(tree["children"][0]["id"], shared);
}

#[test]
fn import_reads_outline_from_stdin() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .args(["import", "-r"])
        .write_stdin("Move house\n\tPack\n\t\tBooks\n\tClean\nTaxes\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 trees (5 nodes)"))
        .stdout(predicate::str::contains(" │   └──[ ] Books (4)"));

    trellis(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout("[ ] Move house (1)\n[ ] Taxes (5)\n");
}

#[test]
fn import_rejects_date_names_without_writing() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .args(["import", "-r"])
        .write_stdin("Plan\n\t2024-01-01\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2002"));
    trellis(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn empty_import_leaves_no_date_node() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .arg("import")
        .write_stdin("")
        .assert()
        .success()
        .stdout("Imported 0 trees (0 nodes)\n");
    trellis(dir.path())
        .arg("lsd")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn completions_name_the_binary() {
    let dir = TempDir::new().expect("tempdir");
    trellis(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}
