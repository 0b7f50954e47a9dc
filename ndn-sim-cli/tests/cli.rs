use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn ping_reports_every_reply() {
    Command::cargo_bin("ndnsim")
        .unwrap()
        .args(["ping", "--latency", "2", "--count", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 Interests sent, 3 Data received"));
}

#[test]
fn run_prints_results_and_captures() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[[nodes]]
name = "a"

[[nodes]]
name = "b"

[[links]]
a = "a"
b = "b"
latency_ms = 3

[[routes]]
node = "a"
prefix = "/b"
via = "b"

[[producers]]
node = "b"
prefix = "/b/hello"
content = "world"

[[interests]]
node = "a"
name = "/b/hello"

[[interests]]
node = "a"
name = "/nowhere"
"#
    )
    .unwrap();

    Command::cargo_bin("ndnsim")
        .unwrap()
        .arg("run")
        .arg(file.path())
        .args(["--captures", "--fib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Satisfied: 1/2"))
        .stdout(predicate::str::contains("no-route"))
        .stdout(predicate::str::contains("\"packet_type\":\"Interest\""))
        .stdout(predicate::str::contains("/b nexthops="));
}

#[test]
fn run_rejects_missing_file() {
    Command::cargo_bin("ndnsim")
        .unwrap()
        .args(["run", "/definitely/not/here.toml"])
        .assert()
        .failure();
}
