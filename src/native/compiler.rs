use std::time::Duration;

use crate::core::registry::BuildPlan;
use crate::core::traits::compiler::{Artifact, CompileError, Compiler};
use crate::native::process::{SupervisionError, run_with_deadline};

#[derive(Clone, Debug)]
pub struct NativeCompiler {
    max_output_bytes: usize,
}

impl NativeCompiler {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }
}

#[async_trait::async_trait]
impl Compiler for NativeCompiler {
    #[tracing::instrument(skip_all, fields(compiler = %plan.command.program.display()))]
    async fn compile(&self, plan: &BuildPlan, limit: Duration) -> Result<Artifact, CompileError> {
        tracing::debug!("Start compiling: {}", plan.command);

        let captured = match run_with_deadline(&plan.command, None, limit, self.max_output_bytes)
            .await
        {
            Ok(captured) => captured,
            Err(SupervisionError::Launch(e)) => {
                return Err(CompileError::LaunchFailed {
                    msg: format!(
                        "Failed to launch compiler {}: {}",
                        plan.command.program.display(),
                        e
                    ),
                });
            }
            Err(SupervisionError::TimedOut { .. }) => {
                return Err(CompileError::TimedOut { limit });
            }
            Err(SupervisionError::Wait(e)) => {
                return Err(CompileError::Internal {
                    msg: format!("Failed to wait for compiler: {}", e),
                });
            }
        };

        if !captured.status.success() {
            tracing::debug!("Compilation failed with {:?}", captured.status);
            return Err(CompileError::CompilationFailed {
                stdout: captured.stdout,
                stderr: captured.stderr,
            });
        }

        // Verify that the artifact was created
        if !tokio::fs::try_exists(&plan.artifact).await.unwrap_or(false) {
            return Err(CompileError::Internal {
                msg: format!("Artifact was not created at: {}", plan.artifact.display()),
            });
        }

        tracing::debug!("Compiled in {:?}", captured.elapsed);
        Ok(Artifact {
            path: plan.artifact.clone(),
        })
    }
}
