use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use assert_cmd::Command;

fn isolated_cmd(temp: &Path) -> Command {
    let xdg_config_home = temp.join(".config");
    fs::create_dir_all(&xdg_config_home).unwrap();
    let mut cmd = Command::cargo_bin("drla").unwrap();
    cmd.env("XDG_CONFIG_HOME", xdg_config_home);
    cmd
}

#[test]
fn set_editor_then_show_round_trips() {
    let temp = tempfile::tempdir().unwrap();

    let mut set = isolated_cmd(temp.path());
    set.args(["config", "set-editor", "vim"]);
    set.assert().success().stdout(contains("Editor set to: vim"));

    let mut show = isolated_cmd(temp.path());
    show.args(["config", "show"]);
    show.assert()
        .success()
        .stdout(contains("=== Current Configuration ==="))
        .stdout(contains("Editor: vim"));
}

#[test]
fn set_repository_requires_existing_path() {
    let temp = tempfile::tempdir().unwrap();

    let mut bad = isolated_cmd(temp.path());
    bad.args(["config", "set-repository", "/no/such/dir"]);
    bad.assert().failure().stderr(contains("does not exist"));

    let repo = temp.path().join("repo");
    fs::create_dir_all(&repo).unwrap();
    let mut good = isolated_cmd(temp.path());
    good.args(["config", "set-repository"]).arg(&repo);
    good.assert().success().stdout(contains("Default repository set to:"));
}

#[test]
fn set_api_key_is_masked_in_show() {
    let temp = tempfile::tempdir().unwrap();

    let mut set = isolated_cmd(temp.path());
    set.args(["config", "set-api-key", "gsk_secret"]);
    set.assert().success().stdout(contains("API key saved successfully!"));

    let mut show = isolated_cmd(temp.path());
    show.args(["config", "show"]);
    show.assert()
        .success()
        .stdout(contains("Groq API Key: **********"))
        .stdout(predicates::str::contains("gsk_secret").not());
}

#[test]
fn set_api_key_without_value_fails_non_interactive() {
    let temp = tempfile::tempdir().unwrap();
    let mut cmd = isolated_cmd(temp.path());
    cmd.args(["config", "set-api-key"]).write_stdin("");
    cmd.assert().failure().stderr(contains("no API key provided"));
}

#[test]
fn configured_default_repository_is_used_by_scan() {
    let temp = tempfile::tempdir().unwrap();
    let repo = temp.path().join("repo");
    fs::create_dir_all(repo.join("rules")).unwrap();
    fs::write(repo.join("rules/r.drl"), "rule \"r\"\nwhen\nthen\nend\n").unwrap();

    let mut set = isolated_cmd(temp.path());
    set.args(["config", "set-repository"]).arg(&repo);
    set.assert().success();

    // No path argument and a different cwd: the configured default applies.
    let mut scan = isolated_cmd(temp.path());
    scan.current_dir(temp.path()).arg("scan");
    scan.assert().success().stdout(contains("1 DRL files"));
}
