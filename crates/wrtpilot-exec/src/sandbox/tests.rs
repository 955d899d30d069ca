//! Tests for sandbox module

use super::*;
use crate::error::ExecError;
use crate::executor::{CommandRunner, RunRequest};
use std::fs::File;
use tokio_util::sync::CancellationToken;

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn sandbox_in(root: &Path) -> Sandbox {
    Sandbox::new(SandboxConfig::default().with_root(root))
}

#[test]
fn test_validate_accepts_plain_command() {
    let sandbox = Sandbox::new(SandboxConfig::default());
    assert!(sandbox.validate_command(&argv(&["uci", "show", "network"])).is_ok());
}

#[test]
fn test_validate_rejects_forbidden_sequences() {
    let sandbox = Sandbox::new(SandboxConfig::default());
    let cases: [&[&str]; 8] = [
        &["echo", "a && b"],
        &["echo", "a|b"],
        &["echo", "`id`"],
        &["echo", "$(id)"],
        &["cat", "../etc/passwd"],
        &["dd", "if=/dev/zero"],
        &["cat", "/proc/self/environ"],
        &["ls", "/sys/class"],
    ];
    for case in cases {
        let err = sandbox.validate_command(&argv(case)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{:?} not rejected", case);
    }
}

#[test]
fn test_validate_rejects_empty_argv() {
    let sandbox = Sandbox::new(SandboxConfig::default());
    assert!(matches!(
        sandbox.validate_command(&[]),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_scratch_dir_is_lazy_and_stable() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);

    let first = sandbox.scratch_dir().unwrap().to_path_buf();
    let second = sandbox.scratch_dir().unwrap().to_path_buf();
    assert_eq!(first, second);
    assert!(first.is_dir());
    assert!(first.starts_with(root.path()));
    assert!(first
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("wrtpilot-sandbox-")));
}

#[test]
fn test_separate_instances_get_separate_scratch_dirs() {
    let root = tempfile::tempdir().unwrap();
    let a = sandbox_in(root.path());
    let b = sandbox_in(root.path());
    assert_ne!(a.scratch_dir().unwrap(), b.scratch_dir().unwrap());
}

#[test]
fn test_scratch_root_that_is_a_file_fails_setup() {
    let root = tempfile::tempdir().unwrap();
    let file = root.path().join("not-a-dir");
    File::create(&file).unwrap();

    let sandbox = sandbox_in(&file);
    assert!(matches!(sandbox.scratch_dir(), Err(Error::Setup { .. })));
}

#[test]
fn test_cleanup_without_scratch_is_noop() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    assert_eq!(sandbox.cleanup().unwrap(), 0);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn test_cleanup_removes_only_stale_entries() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());
    let scratch = sandbox.scratch_dir().unwrap().to_path_buf();

    let old = scratch.join("old.log");
    let fresh = scratch.join("fresh.log");
    let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
    File::create(&old).unwrap().set_modified(two_hours_ago).unwrap();
    File::create(&fresh).unwrap();

    assert_eq!(sandbox.cleanup().unwrap(), 1);
    assert!(!old.exists());
    assert!(fresh.exists());
}

#[test]
fn test_execute_command_environment() {
    let root = tempfile::tempdir().unwrap();
    let sandbox = sandbox_in(root.path());

    let cmd = sandbox
        .execute_command(&argv(&["env"]), "/usr/bin:/bin")
        .unwrap();
    let std_cmd = cmd.as_std();
    let scratch = sandbox.scratch_dir().unwrap();

    assert_eq!(std_cmd.get_program(), "env");
    assert_eq!(std_cmd.get_current_dir(), Some(scratch));

    let mut envs: Vec<(String, String)> = std_cmd
        .get_envs()
        .filter_map(|(k, v)| {
            Some((
                k.to_string_lossy().into_owned(),
                v?.to_string_lossy().into_owned(),
            ))
        })
        .collect();
    envs.sort();
    assert_eq!(
        envs,
        vec![
            ("HOME".to_string(), scratch.display().to_string()),
            ("PATH".to_string(), "/usr/bin:/bin".to_string()),
        ]
    );
}

#[test]
fn test_limits_violation() {
    let limits = ResourceLimits::default()
        .with_max_memory_mb(64)
        .with_max_cpu_percent(50.0);
    assert!(limits.polls_usage());
    assert_eq!(limits.violation(10 * 1024 * 1024, 10.0), None);
    assert!(limits
        .violation(100 * 1024 * 1024, 10.0)
        .is_some_and(|v| v.starts_with("memory")));
    assert!(limits
        .violation(10 * 1024 * 1024, 90.0)
        .is_some_and(|v| v.starts_with("cpu")));
    assert!(!ResourceLimits::default().polls_usage());
}

#[test]
fn test_limits_zero_means_default() {
    let limits = ResourceLimits::default().with_max_execution_secs(0);
    assert_eq!(
        limits.max_execution_time(),
        Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS)
    );
}

#[tokio::test]
async fn test_watch_without_process_is_idle() {
    let monitor = Monitor::new(ResourceLimits::default().with_max_execution_secs(1));
    let watch = monitor.watch(None);
    assert!(watch.finish().is_none());
}

#[tokio::test]
async fn test_runner_rejects_before_spawn() {
    let root = tempfile::tempdir().unwrap();
    let runner = SandboxRunner::new(sandbox_in(root.path()));
    let cancel = CancellationToken::new();
    let command = argv(&["cat", "/proc/self/environ"]);

    let output = runner
        .run(
            RunRequest {
                argv: &command,
                path: "/usr/bin:/bin",
                timeout: Duration::from_secs(5),
                max_output_bytes: 1024,
                cancel: &cancel,
            },
            None,
        )
        .await;

    assert!(matches!(output.error, Some(ExecError::Rejected(_))));
    // Rejected before setup, so no scratch directory exists
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
