use assert_cmd::Command;
use predicates::prelude::*;

fn erp() -> Command {
    Command::cargo_bin("erp").unwrap()
}

#[test]
fn test_version_flag() {
    erp()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("erp"));
}

#[test]
fn test_help_flag() {
    erp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ERP pipeline"));
}

#[test]
fn test_default_run_emits_component_json() {
    erp()
        .args(["--duration", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"component\""))
        .stdout(predicate::str::contains("\"difference\""))
        .stderr(predicate::str::contains("epochs"));
}

#[test]
fn test_compact_output_is_single_line() {
    let output = erp()
        .args(["--duration", "15", "--compact"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.trim().lines().count(), 1);
}

#[test]
fn test_rejects_too_short_duration() {
    erp()
        .args(["--duration", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duration"));
}

#[test]
fn test_writes_output_file() {
    let dir = std::env::temp_dir().join(format!("erp-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("analysis.json");

    erp()
        .args(["--duration", "15", "--output", path.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("Results written to"));

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"component\""));
    std::fs::remove_dir_all(&dir).ok();
}
