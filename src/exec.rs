//! External tool execution with a testable seam.
//!
//! Still capture, text recognition and speech all shell out to command-line
//! tools (`ffmpeg`, `tesseract`, `espeak-ng`). The `CommandExecutor` trait
//! lets tests replace the real processes with recorded calls.

use crate::error::{Result, ShopAssistError};
use async_trait::async_trait;
use tokio::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use from the session task and the speech
/// worker.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    async fn execute(&self, command: &str, args: &[String]) -> Result<String>;
}

/// Production command executor using `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
        tracing::debug!(command, ?args, "executing");
        let output = Command::new(command)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ShopAssistError::ToolNotFound {
                        tool: command.to_string(),
                    }
                } else {
                    ShopAssistError::ToolFailed {
                        tool: command.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ShopAssistError::ToolFailed {
                tool: command.to_string(),
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Mock command executor for testing.
///
/// Records every call and replays queued responses; an empty queue answers
/// with empty stdout.
#[derive(Debug, Default)]
pub struct MockCommandExecutor {
    calls: std::sync::Mutex<Vec<(String, Vec<String>)>>,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
}

impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a successful response to the queue.
    pub fn with_response(self, response: &str) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response.to_string()));
        }
        self
    }

    /// Add an error response to the queue.
    pub fn with_error(self, error: ShopAssistError) -> Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(error));
        }
        self
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command.to_string(), args.to_vec()));
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| Ok(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_system_executor_returns_stdout() {
        let executor = SystemCommandExecutor::new();
        let out = executor.execute("echo", &args(&["hello"])).await.unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn test_system_executor_missing_tool() {
        let executor = SystemCommandExecutor::new();
        let err = executor
            .execute("shopassist-definitely-not-a-tool", &[])
            .await
            .unwrap_err();
        assert!(
            matches!(err, ShopAssistError::ToolNotFound { ref tool } if tool == "shopassist-definitely-not-a-tool"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_system_executor_nonzero_exit() {
        let executor = SystemCommandExecutor::new();
        let err = executor.execute("false", &[]).await.unwrap_err();
        assert!(matches!(err, ShopAssistError::ToolFailed { ref tool, .. } if tool == "false"));
    }

    #[tokio::test]
    async fn test_mock_records_calls_and_replays_responses() {
        let mock = MockCommandExecutor::new()
            .with_response("first")
            .with_error(ShopAssistError::Other("second".to_string()));

        assert_eq!(mock.execute("a", &args(&["1"])).await.unwrap(), "first");
        assert!(mock.execute("b", &[]).await.is_err());
        assert_eq!(mock.execute("c", &[]).await.unwrap(), "");

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[0], ("a".to_string(), args(&["1"])));
    }
}
