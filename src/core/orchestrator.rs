use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use uuid::Uuid;

use crate::config::Config;
use crate::core::classifier::{StageResult, classify};
use crate::core::domain::{ExecutionOutcome, ExecutionRequest, ExecutionState};
use crate::core::registry::{LanguageProfile, LanguageRegistry};
use crate::core::traits::compiler::Compiler;
use crate::core::traits::runner::Runner;
use crate::core::workspace::{Workspace, WorkspaceManager};
use crate::native::compiler::NativeCompiler;
use crate::native::runner::NativeRunner;

/// Per-request progress, logged on every transition.
#[derive(Debug)]
struct Execution {
    id: Uuid,
    state: ExecutionState,
}

impl Execution {
    fn new() -> Self {
        let execution = Self {
            id: Uuid::new_v4(),
            state: ExecutionState::Received,
        };
        tracing::debug!("Execution {}: {:?}", execution.id, execution.state);
        execution
    }

    fn change_state(&mut self, new_state: ExecutionState) {
        tracing::debug!(
            "Execution {}: {:?} -> {:?}",
            self.id,
            self.state,
            new_state
        );
        self.state = new_state;
    }
}

/// Entry point of the execution core. Cheap to share behind an `Arc`; every
/// call to [`CodeExecutor::execute`] is independent.
#[derive(Debug)]
pub struct CodeExecutor {
    registry: Arc<LanguageRegistry>,
    workspaces: WorkspaceManager,
    compiler: Arc<dyn Compiler>,
    runner: Arc<dyn Runner>,
}

impl CodeExecutor {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        workspaces: WorkspaceManager,
        compiler: Arc<dyn Compiler>,
        runner: Arc<dyn Runner>,
    ) -> Self {
        Self {
            registry,
            workspaces,
            compiler,
            runner,
        }
    }

    /// Wires the host toolchains described by `config`.
    pub fn native(config: &Config) -> Self {
        tracing::debug!(
            "Memory ceiling of {} MB is configured but not enforced",
            config.max_memory_mb
        );
        Self::new(
            Arc::new(LanguageRegistry::from_config(config)),
            WorkspaceManager::new(&config.workspace_dir),
            Arc::new(NativeCompiler::new(config.max_output_bytes)),
            Arc::new(NativeRunner::new(config.max_output_bytes)),
        )
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Compiles (if needed) and runs one submission. Never fails: every
    /// fault, including a panic in a build or run step, is reported through
    /// the returned outcome.
    #[tracing::instrument(skip_all, fields(language = %request.language))]
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let mut execution = Execution::new();

        let profile = match self.registry.lookup(&request.language) {
            Ok(profile) => profile,
            Err(err) => {
                tracing::info!("Rejected: {}", err);
                execution.change_state(ExecutionState::Cleaned);
                return ExecutionOutcome::unsupported(&err);
            }
        };
        execution.change_state(ExecutionState::LanguageResolved);

        let result = AssertUnwindSafe(self.execute_resolved(profile, request, &mut execution))
            .catch_unwind()
            .await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                tracing::error!("Execution {} panicked: {}", execution.id, msg);
                ExecutionOutcome::internal(format!("Internal error: {msg}"))
            }
        };
        execution.change_state(ExecutionState::Cleaned);

        tracing::info!(
            success = outcome.success,
            failure = ?outcome.failure,
            execution_time = outcome.execution_time,
            "Execution {} finished",
            execution.id
        );
        outcome
    }

    async fn execute_resolved(
        &self,
        profile: &LanguageProfile,
        request: &ExecutionRequest,
        execution: &mut Execution,
    ) -> ExecutionOutcome {
        let source_file_name = profile.source_file_name(&request.code);
        let workspace = match self.workspaces.acquire(&source_file_name).await {
            Ok(workspace) => workspace,
            Err(err) => {
                tracing::error!("Internal error before execution: {}", err);
                return ExecutionOutcome::internal(err.to_string());
            }
        };

        let outcome = self
            .build_and_run(profile, request, &workspace, execution)
            .await;
        // A panic above unwinds through the workspace's Drop instead.
        workspace.release().await;
        outcome
    }

    async fn build_and_run(
        &self,
        profile: &LanguageProfile,
        request: &ExecutionRequest,
        workspace: &Workspace,
        execution: &mut Execution,
    ) -> ExecutionOutcome {
        if let Err(err) = workspace.write_source(&request.code).await {
            tracing::error!("Internal error before execution: {}", err);
            return ExecutionOutcome::internal(err.to_string());
        }

        let artifact = match profile.build_plan(workspace) {
            Some(plan) => {
                execution.change_state(ExecutionState::Building);
                match self.compiler.compile(&plan, profile.timeout).await {
                    Ok(artifact) => {
                        execution.change_state(ExecutionState::Built);
                        Some(artifact)
                    }
                    Err(err) => {
                        execution.change_state(ExecutionState::BuildFailed);
                        return classify(StageResult::BuildFailed(err));
                    }
                }
            }
            None => None,
        };

        execution.change_state(ExecutionState::Running);
        let command = profile.run_command(workspace, artifact.as_ref());
        let result = self
            .runner
            .run(&command, request.stdin(), profile.timeout)
            .await;

        let outcome = classify(StageResult::Ran(result));
        execution.change_state(ExecutionState::after_run(&outcome));
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
