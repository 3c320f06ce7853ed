use std::time::Duration;

use crate::core::registry::BuildPlan;
use crate::core::traits::compiler::{Artifact, CompileError, Compiler};

#[derive(Debug, Clone)]
pub struct CompilerStub {
    result: Result<(), CompileError>,
    delay: Duration,
}

impl CompilerStub {
    pub fn new(result: Result<(), CompileError>, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl Compiler for CompilerStub {
    #[tracing::instrument]
    async fn compile(&self, plan: &BuildPlan, limit: Duration) -> Result<Artifact, CompileError> {
        tracing::debug!("Start compilation: plan={:?}, limit={:?}", plan, limit);
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Compilation result: {:?}", self.result);

        self.result.clone().map(|_| Artifact {
            path: plan.artifact.clone(),
        })
    }
}
