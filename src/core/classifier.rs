use std::time::Duration;

use crate::core::domain::{ExecutionOutcome, FailureKind};
use crate::core::traits::compiler::CompileError;
use crate::core::traits::runner::{ExitState, RunError, RunResult};

/// What the build and run steps produced for one request.
#[derive(Debug)]
pub enum StageResult {
    BuildFailed(CompileError),
    Ran(Result<RunResult, RunError>),
}

pub fn timeout_message(limit: Duration) -> String {
    format!("Code execution timed out (limit: {}s)", limit.as_secs_f64())
}

pub fn classify(stages: StageResult) -> ExecutionOutcome {
    match stages {
        StageResult::BuildFailed(err) => classify_build_failure(err),
        StageResult::Ran(Ok(result)) => classify_exit(result),
        StageResult::Ran(Err(err)) => classify_run_error(err),
    }
}

fn classify_build_failure(err: CompileError) -> ExecutionOutcome {
    match err {
        CompileError::CompilationFailed { stdout, stderr } => {
            let error = if stderr.is_empty() {
                "Compilation failed".to_string()
            } else {
                stderr
            };
            ExecutionOutcome::failure(FailureKind::CompileFailure, error, Some(stdout), Duration::ZERO)
        }
        CompileError::TimedOut { limit } => ExecutionOutcome::failure(
            FailureKind::Timeout,
            format!("Compilation timed out (limit: {}s)", limit.as_secs_f64()),
            None,
            limit,
        ),
        CompileError::LaunchFailed { msg } => {
            ExecutionOutcome::failure(FailureKind::LaunchFailure, msg, None, Duration::ZERO)
        }
        CompileError::Internal { msg } => ExecutionOutcome::internal(msg),
    }
}

fn classify_exit(result: RunResult) -> ExecutionOutcome {
    if result.status.success() {
        return ExecutionOutcome::success(result.stdout, result.elapsed);
    }

    let error = match (result.stderr.is_empty(), result.status) {
        (false, _) => result.stderr,
        (true, ExitState::Signal(signal)) => format!("Execution failed (terminated by signal {signal})"),
        (true, ExitState::Code(_)) => "Execution failed".to_string(),
    };
    ExecutionOutcome::failure(
        FailureKind::RuntimeFailure,
        error,
        Some(result.stdout),
        result.elapsed,
    )
}

fn classify_run_error(err: RunError) -> ExecutionOutcome {
    match err {
        RunError::TimedOut { limit, stdout, .. } => ExecutionOutcome::failure(
            FailureKind::Timeout,
            timeout_message(limit),
            Some(stdout),
            limit,
        ),
        RunError::LaunchFailed { msg } => {
            ExecutionOutcome::failure(FailureKind::LaunchFailure, msg, None, Duration::ZERO)
        }
        RunError::Internal { msg } => ExecutionOutcome::internal(msg),
    }
}
