//! End-to-end tests for the throughput sweep binary, driven against
//! regular files standing in for the H2C device node.

#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;

fn bench() -> Command {
    Command::cargo_bin("xdma-bench").unwrap()
}

#[test]
fn test_sweep_emits_one_line_per_bucket() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let output = bench()
        .args([
            "--device",
            tmp.path().to_str().unwrap(),
            "--buckets",
            "4",
            "--trials",
            "2",
            "--offset",
            "0x0",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^Bytes:2 usecs:\d+ MB/s:").unwrap())
        .stdout(predicate::str::contains("Bytes:16 "))
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 4);
    for line in stdout.lines() {
        assert!(line.starts_with("Bytes:"), "unexpected line: {line}");
        assert!(line.contains(" usecs:"));
        assert!(line.contains(" MB/s:"));
    }
}

#[test]
fn test_sweep_sizes_double_until_cap() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let output = bench()
        .args([
            "--device",
            tmp.path().to_str().unwrap(),
            "--buckets",
            "6",
            "--trials",
            "1",
            "--offset",
            "0",
            "--max-transfer",
            "16",
        ])
        .assert()
        .success()
        .get_output()
        .clone();

    let sizes: Vec<u64> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| {
            line.split_whitespace()
                .next()
                .and_then(|field| field.strip_prefix("Bytes:"))
                .and_then(|n| n.parse().ok())
                .unwrap()
        })
        .collect();
    assert_eq!(sizes, vec![2, 4, 8, 16, 16, 16]);
}

#[test]
fn test_json_report_carries_config_and_results() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let output = bench()
        .args([
            "--device",
            tmp.path().to_str().unwrap(),
            "--buckets",
            "3",
            "--trials",
            "1",
            "--offset",
            "0",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .clone();

    let doc: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(doc["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(doc["config"]["buckets"], 3);
    assert_eq!(doc["config"]["trials"], 1);
    assert_eq!(doc["config"]["averaging_divisor"], 2);
    assert_eq!(doc["results"].as_array().unwrap().len(), 3);
    assert_eq!(doc["results"][0]["bytes"], 2);
    assert_eq!(doc["results"][2]["bytes"], 8);
}

#[test]
fn test_missing_device_fails_with_open_error() {
    bench()
        .args(["--device", "/nonexistent/xdma0_h2c_0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open"));
}

#[test]
fn test_bad_offset_is_a_usage_error() {
    bench()
        .args(["--offset", "0xzz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid hex offset"));
}

#[test]
fn test_zero_averaging_divisor_rejected() {
    bench()
        .args(["--averaging-divisor", "0"])
        .assert()
        .failure();
}

#[test]
fn test_help_documents_the_sweep_knobs() {
    bench()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--buckets"))
        .stdout(predicate::str::contains("--trials"))
        .stdout(predicate::str::contains("--averaging-divisor"))
        .stdout(predicate::str::contains("--allow-short-writes"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_report_is_emitted_before_the_channel_closes() {
    // Merging stderr into stdout serializes the report lines and the
    // close trace onto one stream, so their order is observable.
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let script = format!(
        "exec {} --device '{}' --buckets 2 --trials 1 --offset 0x0 --debug 2>&1",
        env!("CARGO_BIN_EXE_xdma-bench"),
        tmp.path().display()
    );

    let output = StdCommand::new("sh")
        .args(["-c", &script])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();
    assert!(output.status.success());

    let merged = String::from_utf8_lossy(&output.stdout);
    let report_end = merged.rfind("MB/s:").expect("report lines missing");
    let close_at = merged
        .find("closing DMA channel")
        .expect("close trace missing");
    assert!(
        report_end < close_at,
        "channel closed before the report was out:\n{merged}"
    );
}
