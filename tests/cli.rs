use assert_cmd::Command;
use predicates::prelude::*;

fn fetchscribe() -> Command {
    Command::cargo_bin("fetchscribe").unwrap()
}

#[test]
fn help_lists_both_pipelines() {
    fetchscribe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("transcribe"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn fetch_help_shows_defaults() {
    fetchscribe()
        .args(["fetch", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5TBgsf5chxQ"))
        .stdout(predicate::str::contains("audio_input"))
        .stdout(predicate::str::contains("video"));
}

#[test]
fn transcribe_without_files_is_a_usage_error() {
    fetchscribe()
        .arg("transcribe")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("FILE"));
}

#[test]
fn unknown_fetch_mode_is_rejected() {
    fetchscribe()
        .args(["fetch", "--mode", "lossless"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lossless"));
}
