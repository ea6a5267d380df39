//! CLI smoke tests: flag surface and usage errors, no database needed.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn dbtoyaml_help_lists_flags() {
    Command::cargo_bin("dbtoyaml")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"))
        .stdout(predicate::str::contains("--no-owner"))
        .stdout(predicate::str::contains("--no-privileges"))
        .stdout(predicate::str::contains("--multiple-files"));
}

#[test]
fn yamltodb_help_lists_flags() {
    Command::cargo_bin("yamltodb")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--single-transaction"))
        .stdout(predicate::str::contains("--update"))
        .stdout(predicate::str::contains("--revert"));
}

#[test]
fn dbaugment_help_succeeds() {
    Command::cargo_bin("dbaugment")
        .unwrap()
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn missing_database_argument_is_a_usage_error() {
    Command::cargo_bin("dbtoyaml")
        .unwrap()
        .env_remove("PGDATABASE")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
