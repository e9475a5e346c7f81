use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("bankgate")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("profile"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("bankgate")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("set-api"));
}

#[test]
fn test_login_requires_user() {
    cargo_bin_cmd!("bankgate")
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("bankgate")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
