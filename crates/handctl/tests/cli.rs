//! End-to-end tests for the handctl binary, run against the simulated bus.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn handctl() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("handctl")?;
    cmd.env_remove("HANDCTL_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    Ok(cmd)
}

#[test]
fn test_help_lists_subcommands() -> TestResult {
    handctl()?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("calibrate"));
    Ok(())
}

#[test]
fn test_presets_json_is_machine_readable() -> TestResult {
    let output = handctl()?.args(["presets", "--json"]).output()?;
    assert!(output.status.success());
    let presets: Value = serde_json::from_slice(&output.stdout)?;
    let names: Vec<&str> = presets
        .as_array()
        .ok_or("expected an array")?
        .iter()
        .filter_map(|p| p.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["extended", "spread", "fist"]);
    assert_eq!(presets.pointer("/0/joints/01_lat"), Some(&Value::from(400)));
    Ok(())
}

#[test]
fn test_simulated_send_moves_thumb() -> TestResult {
    handctl()?
        .args(["--simulate", "send", "command3,250,300,310"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"01_lat\s+0x41\s+ch2\s+310")?);
    Ok(())
}

#[test]
fn test_malformed_line_exits_with_usage_code() -> TestResult {
    handctl()?
        .args(["--simulate", "send", "command3,250"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Command rejected"));
    Ok(())
}

#[test]
fn test_simulated_preset_reports_joint_count() -> TestResult {
    handctl()?
        .args(["--simulate", "preset", "spread"])
        .assert()
        .success()
        .stdout(predicate::str::contains("to 16 joints"));
    Ok(())
}

#[test]
fn test_unknown_preset_is_rejected() -> TestResult {
    handctl()?
        .args(["--simulate", "preset", "claw"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown preset"));
    Ok(())
}

#[test]
fn test_simulated_serve_reads_stdin() -> TestResult {
    handctl()?
        .args(["--simulate", "serve", "--stdin"])
        .write_stdin("command3,270,270,400\nbogus\ncommand3,1\r\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 lines"))
        .stdout(predicate::str::is_match(r"01_dist\s+0x41\s+ch1\s+270")?);
    Ok(())
}

#[test]
fn test_simulated_calibration_routine() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("handctl.yaml");
    // Keep the simulated holds short.
    fs::write(&path, "calibration:\n  step_delay_ms: 1\n  finger_gap_ms: 1\n")?;
    handctl()?
        .args(["--simulate", "calibrate", "finger", "--finger", "3", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("finger: done after 1 cycles"));
    Ok(())
}

#[test]
fn test_invalid_config_exits_with_config_code() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("handctl.yaml");
    fs::write(&path, "serial:\n  baud_rate: 0\n")?;
    handctl()?
        .args(["--simulate", "presets", "--config"])
        .arg(&path)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("baud_rate"));
    Ok(())
}

#[test]
fn test_config_from_environment() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("handctl.yaml");
    fs::write(&path, "protocol:\n  accept_numeric_opcodes: true\n")?;
    handctl()?
        .env("HANDCTL_CONFIG", &path)
        .args(["--simulate", "send", "3,250,300,310"])
        .assert()
        .success();
    Ok(())
}
