use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use std::process::Command;

fn isolated_cmd(temp: &Path) -> Command {
    let xdg_config_home = temp.join(".config");
    fs::create_dir_all(&xdg_config_home).unwrap();
    let mut cmd = Command::cargo_bin("drla").unwrap();
    cmd.env("XDG_CONFIG_HOME", xdg_config_home);
    cmd
}

fn write_repo_with_rule(root: &Path, body_lines: usize) {
    fs::create_dir_all(root.join("rules")).unwrap();
    let mut rule = String::from("rule \"Big\"\nwhen\nthen\n");
    for i in 0..body_lines {
        rule.push_str(&format!("    // action line {}\n", i));
    }
    rule.push_str("end\n");
    fs::write(root.join("rules/big.drl"), rule).unwrap();
}

#[test]
fn context_truncates_at_limit() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    write_repo_with_rule(&repo, 100);

    let mut cmd = isolated_cmd(temp.path());
    cmd.arg("--repo").arg(&repo).args(["context", "--limit", "200"]);
    cmd.assert()
        .success()
        .stdout(contains("=== Repository Context ==="))
        .stdout(contains("truncated, showing first 200 characters"));
}

#[test]
fn context_shows_everything_under_limit() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    write_repo_with_rule(&repo, 1);

    let mut cmd = isolated_cmd(temp.path());
    cmd.arg("--repo").arg(&repo).args(["context", "--limit", "100000"]);
    let assert = cmd.assert().success();
    assert
        .stdout(contains("File:"))
        .stdout(contains("rule \"Big\""))
        .stdout(predicates::str::contains("truncated").not());
}

#[test]
fn context_json_reports_sizes() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    write_repo_with_rule(&repo, 100);

    let mut cmd = isolated_cmd(temp.path());
    cmd.arg("--json").arg("--repo").arg(&repo).args(["context", "--limit", "50"]);
    cmd.assert()
        .success()
        .stdout(contains("\"total_chars\""))
        .stdout(contains("\"shown_chars\":50"));
}

#[test]
fn context_without_files_errors() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("empty");
    fs::create_dir_all(&repo).unwrap();

    let mut cmd = isolated_cmd(temp.path());
    cmd.arg("--repo").arg(&repo).arg("context");
    cmd.assert().failure().stderr(contains("no repository context available"));
}
