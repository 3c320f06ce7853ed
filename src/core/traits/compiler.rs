use std::path::PathBuf;
use std::time::Duration;

use crate::core::registry::BuildPlan;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    CompilationFailed { stdout: String, stderr: String },
    TimedOut { limit: Duration },
    LaunchFailed { msg: String },
    Internal { msg: String },
}

/// Build product handed to the run step.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    async fn compile(&self, plan: &BuildPlan, limit: Duration) -> Result<Artifact, CompileError>;
}
