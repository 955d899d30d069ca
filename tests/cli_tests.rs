//! End-to-end tests of the wrtpilot binary

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn wrtpilot(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wrtpilot"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_check_accepts_plain_plan() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        dir.path(),
        "plan.json",
        r#"{ "summary": "show config", "commands": [{ "command": ["uci", "show"] }] }"#,
    );

    let out = wrtpilot(dir.path(), &["check", plan.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("uci show"));
}

#[test]
fn test_check_rejects_denied_command() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        dir.path(),
        "plan.json",
        r#"{ "commands": [{ "command": ["rm", "-rf", "/"] }] }"#,
    );

    let out = wrtpilot(dir.path(), &["check", plan.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("blocked by denylist"));
}

#[test]
fn test_run_reports_failure_with_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        dir.path(),
        "plan.json",
        r#"{ "commands": [{ "command": ["echo", "hi"] }, { "command": ["false"] }] }"#,
    );

    let out = wrtpilot(dir.path(), &["run", "--json", plan.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let items = report["results"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["output"], "hi\n");
    assert!(items[0]["error"].is_null());
    assert_eq!(items[1]["error"]["kind"], "exit");
    assert_eq!(report["results"]["failed"], 1);
}

#[test]
fn test_run_retries_with_fix_table() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        dir.path(),
        "plan.json",
        r#"{ "commands": [{ "command": ["false"] }] }"#,
    );
    let fixes = write(
        dir.path(),
        "fixes.json",
        r#"{ "false": { "commands": [{ "command": ["true"] }] } }"#,
    );
    let config = write(dir.path(), "wrtpilot.toml", "[retry]\nenabled = true\n");

    let out = wrtpilot(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "run",
            "--quiet",
            "--fixes",
            fixes.to_str().unwrap(),
            plan.to_str().unwrap(),
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stdout));
    assert!(String::from_utf8_lossy(&out.stdout).contains("[fix 1] true (ok)"));
}

#[test]
fn test_run_streams_stderr_prefixed() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write(
        dir.path(),
        "plan.json",
        r#"{ "commands": [{ "command": ["sh", "-c", "echo oops 1>&2"] }] }"#,
    );

    let out = wrtpilot(dir.path(), &["run", plan.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("stderr: oops"));
}
