use std::time::Duration;

use crate::core::registry::CommandSpec;
use crate::core::traits::runner::{RunError, RunResult, Runner};
use crate::native::process::{SupervisionError, run_with_deadline};

#[derive(Clone, Debug)]
pub struct NativeRunner {
    max_output_bytes: usize,
}

impl NativeRunner {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    #[tracing::instrument(skip_all, fields(program = %command.program.display()))]
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
    ) -> Result<RunResult, RunError> {
        tracing::debug!("Start execution: {}", command);

        match run_with_deadline(command, Some(stdin), limit, self.max_output_bytes).await {
            Ok(captured) => {
                tracing::debug!(
                    "Execution finished: status={:?}, elapsed={:?}",
                    captured.status,
                    captured.elapsed
                );
                Ok(RunResult {
                    status: captured.status,
                    stdout: captured.stdout,
                    stderr: captured.stderr,
                    elapsed: captured.elapsed,
                })
            }
            Err(SupervisionError::Launch(e)) => Err(RunError::LaunchFailed {
                msg: format!("Failed to launch {}: {}", command.program.display(), e),
            }),
            Err(SupervisionError::TimedOut { stdout, stderr }) => Err(RunError::TimedOut {
                limit,
                stdout,
                stderr,
            }),
            Err(SupervisionError::Wait(e)) => Err(RunError::Internal {
                msg: format!("Failed to wait for process: {}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::runner::ExitState;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            current_dir: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn test_input_output_handling() {
        let result = NativeRunner::new(1024)
            .run(&sh("read name; echo \"Hello, $name!\""), "Rust\n", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.status, ExitState::Code(0));
        assert_eq!(result.stdout, "Hello, Rust!\n");
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_error_keeps_streams() {
        let result = NativeRunner::new(1024)
            .run(&sh("echo half; echo boom >&2; exit 1"), "", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.status, ExitState::Code(1));
        assert_eq!(result.stdout, "half\n");
        assert_eq!(result.stderr, "boom\n");
    }

    #[tokio::test]
    async fn test_time_limit_exceeded() {
        let limit = Duration::from_millis(300);

        let result = NativeRunner::new(1024).run(&sh("sleep 10"), "", limit).await;

        assert!(matches!(result, Err(RunError::TimedOut { limit: l, .. }) if l == limit));
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let mut command = sh("");
        command.program = "/aboba".into();

        let result = NativeRunner::new(1024)
            .run(&command, "", Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(RunError::LaunchFailed { .. })));
    }
}
