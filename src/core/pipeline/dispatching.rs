use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;

use crate::core::domain::{ExecutionOutcome, ExecutionRequest};
use crate::core::orchestrator::CodeExecutor;

const QUEUE_CLOSED_ERR: &str = "Execution queue is closed";
const WORKER_GONE_ERR: &str = "Execution worker stopped before replying";

#[derive(Debug)]
pub struct Job {
    pub request: ExecutionRequest,
    pub submitted_at: DateTime<Utc>,
    reply: oneshot::Sender<ExecutionOutcome>,
}

/// Receives jobs and runs each one on its own task, at most `max_parallel`
/// at a time when a bound is given.
#[tracing::instrument(skip_all)]
pub fn handle_executions(
    mut job_rx: Receiver<Job>,
    executor: Arc<CodeExecutor>,
    max_parallel: Option<usize>,
) -> JoinHandle<()> {
    let permits = max_parallel.map(|n| Arc::new(Semaphore::new(n.max(1))));

    tokio::spawn(async move {
        while let Some(job) = job_rx.recv().await {
            let permit = match &permits {
                Some(permits) => match permits.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
                None => None,
            };
            let executor = executor.clone();

            tokio::spawn(async move {
                let waited = Utc::now() - job.submitted_at;
                tracing::debug!("Job started after {} ms in queue", waited.num_milliseconds());

                let outcome = executor.execute(&job.request).await;
                drop(permit);

                if job.reply.send(outcome).is_err() {
                    tracing::debug!("Submitter went away before the outcome was ready");
                }
            });
        }
        tracing::debug!("Execution queue drained");
    })
}

/// Handle for submitting requests to a background dispatcher.
#[derive(Clone, Debug)]
pub struct ExecutionQueue {
    job_tx: Sender<Job>,
}

impl ExecutionQueue {
    pub fn spawn(executor: Arc<CodeExecutor>, capacity: usize, max_parallel: Option<usize>) -> Self {
        let (job_tx, job_rx) = mpsc::channel(capacity.max(1));
        handle_executions(job_rx, executor, max_parallel);
        Self { job_tx }
    }

    /// Waits for the outcome of `request`. Queue failures are reported as
    /// internal-error outcomes.
    pub async fn submit(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let (reply, outcome_rx) = oneshot::channel();
        let job = Job {
            request,
            submitted_at: Utc::now(),
            reply,
        };

        if self.job_tx.send(job).await.is_err() {
            tracing::error!("{}", QUEUE_CLOSED_ERR);
            return ExecutionOutcome::internal(QUEUE_CLOSED_ERR);
        }

        outcome_rx.await.unwrap_or_else(|_| {
            tracing::error!("{}", WORKER_GONE_ERR);
            ExecutionOutcome::internal(WORKER_GONE_ERR)
        })
    }
}
