use std::time::Duration;

use crate::core::registry::CommandSpec;
use crate::core::traits::runner::{RunError, RunResult, Runner};

#[derive(Debug, Clone)]
pub struct RunnerStub {
    result: Result<RunResult, RunError>,
    delay: Duration,
}

impl RunnerStub {
    pub fn new(result: Result<RunResult, RunError>, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl Runner for RunnerStub {
    #[tracing::instrument]
    async fn run(
        &self,
        command: &CommandSpec,
        stdin: &str,
        limit: Duration,
    ) -> Result<RunResult, RunError> {
        tracing::debug!(
            "Start execution: command={}, stdin={:?}, limit={:?}",
            command,
            stdin,
            limit
        );
        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.result);

        self.result.clone()
    }
}
