//! Tests for executor module

use super::*;
use crate::output::{OutputLine, OutputStream};
use std::collections::HashSet;
use std::sync::Mutex;

/// Records every argv it is asked to run; programs in `failing` exit 1
#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeRunner {
    fn failing(programs: &[&str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: programs.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, request: RunRequest<'_>, sink: Option<&mut dyn OutputSink>) -> RunOutput {
        self.calls.lock().unwrap().push(request.argv.to_vec());
        let program = request.argv[0].clone();
        if let Some(sink) = sink {
            sink.line(OutputStream::Stdout, &format!("out {}", program));
            sink.line(OutputStream::Stderr, &format!("err {}", program));
        }
        if self.failing.contains(&program) {
            RunOutput::failure(format!("{} broke", program), ExecError::Exit { code: 1 })
        } else {
            RunOutput::success(format!("{} ok", program))
        }
    }
}

fn executor(config: ExecutorConfig, runner: &Arc<FakeRunner>) -> Executor {
    Executor::with_runner(config, runner.clone())
}

fn plan(programs: &[&str]) -> Plan {
    Plan::new(programs.iter().map(|p| PlannedCommand::new([*p])).collect())
}

#[tokio::test]
async fn test_run_command_success() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default(), &runner);

    let result = exec
        .run_command(&CancellationToken::new(), &PlannedCommand::new(["uci", "show"]))
        .await;

    assert!(result.is_success());
    assert_eq!(result.index, 0);
    assert_eq!(result.output, "uci ok");
    assert_eq!(runner.calls(), vec![vec!["uci".to_string(), "show".to_string()]]);
}

#[tokio::test]
async fn test_empty_command_is_not_spawned() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default(), &runner);

    let result = exec
        .run_command(&CancellationToken::new(), &PlannedCommand::new(Vec::<String>::new()))
        .await;

    assert_eq!(result.error, Some(ExecError::EmptyCommand));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_elevation_prefix_for_root_commands() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default().with_elevation("sudo  -n"), &runner);

    let plan = Plan::new(vec![
        PlannedCommand::new(["opkg", "update"]).with_root(true),
        PlannedCommand::new(["uptime"]),
    ]);
    let results = exec.run_plan(&CancellationToken::new(), &plan).await;

    assert!(results.is_success());
    assert_eq!(
        runner.calls(),
        vec![
            vec!["sudo".to_string(), "-n".into(), "opkg".into(), "update".into()],
            vec!["uptime".to_string()],
        ]
    );
    assert_eq!(results.items()[0].command_line(), "sudo -n opkg update");
}

#[tokio::test]
async fn test_root_command_without_elevation_runs_as_is() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default(), &runner);

    let command = PlannedCommand::new(["reboot"]).with_root(true);
    exec.run_command(&CancellationToken::new(), &command).await;

    assert_eq!(runner.calls(), vec![vec!["reboot".to_string()]]);
}

#[tokio::test]
async fn test_failure_does_not_stop_plan() {
    let runner = Arc::new(FakeRunner::failing(&["bad1", "bad2"]));
    let exec = executor(ExecutorConfig::default(), &runner);

    let results = exec
        .run_plan(&CancellationToken::new(), &plan(&["bad1", "good", "bad2", "last"]))
        .await;

    assert_eq!(runner.calls().len(), 4);
    assert_eq!(results.failed(), 2);
    assert_eq!(results.failed_indices(), vec![0, 2]);
    let errors = results.items().iter().filter(|r| r.error.is_some()).count();
    assert_eq!(results.failed(), errors);
    let indices: Vec<usize> = results.items().iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_streaming_forwards_lines_in_order() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default(), &runner);

    let mut lines: Vec<OutputLine> = Vec::new();
    let results = exec
        .run_plan_streaming(&CancellationToken::new(), &plan(&["a", "b"]), &mut lines)
        .await;

    assert!(results.is_success());
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["out a", "err a", "out b", "err b"]);
    assert_eq!(lines[1].stream, OutputStream::Stderr);
}

#[tokio::test]
async fn test_cancelled_plan_spawns_nothing() {
    let runner = Arc::new(FakeRunner::default());
    let exec = executor(ExecutorConfig::default(), &runner);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let results = exec.run_plan(&cancel, &plan(&["a", "b"])).await;

    assert!(runner.calls().is_empty());
    assert_eq!(results.failed(), 2);
    assert!(results
        .items()
        .iter()
        .all(|r| r.error == Some(ExecError::Cancelled)));
}

#[test]
fn test_config_zero_timeout_uses_default() {
    let config = ExecutorConfig::default().with_timeout_secs(0);
    assert_eq!(config.timeout(), std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS));

    let config = ExecutorConfig::default().with_timeout_secs(5);
    assert_eq!(config.timeout(), std::time::Duration::from_secs(5));
}

#[test]
fn test_config_deserialize_defaults() {
    let config: ExecutorConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    assert_eq!(config.max_output_bytes, crate::output::DEFAULT_MAX_OUTPUT_BYTES);
    assert!(config.elevation_command.is_none());
    assert_eq!(config.fallback_path, FALLBACK_PATH);
}

#[test]
fn test_elevation_tokens_split_on_whitespace() {
    let config = ExecutorConfig::default().with_elevation(" doas\t-u root ");
    assert_eq!(config.elevation_tokens(), vec!["doas", "-u", "root"]);
    assert!(ExecutorConfig::default().elevation_tokens().is_empty());
}
