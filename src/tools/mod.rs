//! External process execution.
//!
//! Every external collaborator (converter, silence filter, duration probe,
//! recorder enumeration) goes through the [`ToolRunner`] trait so pipeline
//! logic stays decoupled from which binary is invoked and can be exercised
//! with a mock in tests.

pub mod probe;

use crate::error::{Result, ScribaError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished external process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit status code; -1 if the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// True if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Trait for running external command-line tools to completion.
///
/// Launch failures (binary missing, spawn error) are a [`ScribaError::ToolExecution`];
/// a non-zero exit is reported through [`ToolOutput::status`] and judged by the caller,
/// since some tools (ffmpeg silencedetect) put their useful output on stderr.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput>;
}

/// Real implementation spawning processes via tokio.
#[derive(Debug, Default)]
pub struct ProcessToolRunner;

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ScribaError::ToolExecution {
                tool: program.to_string(),
                message: format!("failed to launch: {}", e),
            })?;

        Ok(ToolOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Scripted tool runner for tests.
///
/// Responses are consumed in order; each may carry a filesystem side effect
/// (e.g. creating the output file ffmpeg would have written). All invocations
/// are recorded for assertions.
pub struct MockToolRunner {
    responses: std::sync::Mutex<std::collections::VecDeque<MockResponse>>,
    calls: std::sync::Mutex<Vec<(String, Vec<String>)>>,
}

struct MockResponse {
    result: Result<ToolOutput>,
    side_effect: Option<Box<dyn Fn() + Send + Sync>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response.
    pub fn push_output(&self, status: i32, stdout: &str, stderr: &str) {
        self.push_response(Ok(ToolOutput {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }));
    }

    /// Queue a launch failure.
    pub fn push_launch_failure(&self, tool: &str) {
        self.push_response(Err(ScribaError::ToolExecution {
            tool: tool.to_string(),
            message: "failed to launch: No such file or directory".to_string(),
        }));
    }

    pub fn push_response(&self, result: Result<ToolOutput>) {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .push_back(MockResponse {
                result,
                side_effect: None,
            });
    }

    /// Queue a successful response with a filesystem side effect that runs
    /// when the call is made.
    pub fn push_output_with_effect<F>(&self, status: i32, stdout: &str, stderr: &str, effect: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.responses
            .lock()
            .expect("mock lock poisoned")
            .push_back(MockResponse {
                result: Ok(ToolOutput {
                    status,
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                }),
                side_effect: Some(Box::new(effect)),
            });
    }

    /// All `(program, args)` invocations recorded so far.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock poisoned").len()
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push((program.to_string(), args.to_vec()));

        let response = self
            .responses
            .lock()
            .expect("mock lock poisoned")
            .pop_front();

        match response {
            Some(r) => {
                if let Some(effect) = &r.side_effect {
                    effect();
                }
                r.result
            }
            None => Ok(ToolOutput {
                status: 0,
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_runner_returns_scripted_responses_in_order() {
        let runner = MockToolRunner::new();
        runner.push_output(0, "first", "");
        runner.push_output(1, "", "boom");

        let a = runner.run("ffmpeg", &[]).await.unwrap();
        assert!(a.success());
        assert_eq!(a.stdout, "first");

        let b = runner.run("ffmpeg", &[]).await.unwrap();
        assert!(!b.success());
        assert_eq!(b.stderr, "boom");
    }

    #[tokio::test]
    async fn mock_runner_records_calls() {
        let runner = MockToolRunner::new();
        runner.push_output(0, "", "");
        runner
            .run("ffprobe", &["-v".to_string(), "error".to_string()])
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "ffprobe");
        assert_eq!(calls[0].1, vec!["-v".to_string(), "error".to_string()]);
    }

    #[tokio::test]
    async fn mock_runner_side_effect_runs_on_call() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("out.wav");
        let marker_clone = marker.clone();

        let runner = MockToolRunner::new();
        runner.push_output_with_effect(0, "", "", move || {
            std::fs::write(&marker_clone, b"data").unwrap();
        });

        assert!(!marker.exists());
        runner.run("ffmpeg", &[]).await.unwrap();
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn mock_runner_launch_failure_is_tool_execution_error() {
        let runner = MockToolRunner::new();
        runner.push_launch_failure("arecord");

        let err = runner.run("arecord", &[]).await.unwrap_err();
        match err {
            ScribaError::ToolExecution { tool, .. } => assert_eq!(tool, "arecord"),
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn process_runner_reports_missing_binary_as_tool_execution() {
        let runner = ProcessToolRunner;
        let err = runner
            .run("scriba-definitely-not-a-real-binary", &[])
            .await
            .unwrap_err();
        match err {
            ScribaError::ToolExecution { tool, .. } => {
                assert_eq!(tool, "scriba-definitely-not-a-real-binary");
            }
            other => panic!("expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn process_runner_captures_stdout_and_status() {
        let runner = ProcessToolRunner;
        let out = runner
            .run("sh", &["-c".to_string(), "echo hello".to_string()])
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn process_runner_reports_nonzero_exit_in_output() {
        let runner = ProcessToolRunner;
        let out = runner
            .run("sh", &["-c".to_string(), "exit 3".to_string()])
            .await
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.status, 3);
    }
}
