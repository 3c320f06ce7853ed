use std::time::Duration;

use crate::core::registry::CommandSpec;

/// How a finished child process ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitState {
    Code(i32),
    Signal(i32),
}

impl ExitState {
    pub fn success(&self) -> bool {
        matches!(self, ExitState::Code(0))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunResult {
    pub status: ExitState,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    TimedOut {
        limit: Duration,
        stdout: String,
        stderr: String,
    },
    LaunchFailed {
        msg: String,
    },
    Internal {
        msg: String,
    },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
    ) -> Result<RunResult, RunError>;
}
