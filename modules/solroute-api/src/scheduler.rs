use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::error;

use crate::runner::{BatchJob, BatchRunner, RunReport};

/// Launches batch runs as detached tasks and keeps their handles, so a run
/// can be awaited by operation id (tests) or all at once (shutdown).
///
/// There is no concurrency limit: every submitted job gets its own task.
#[derive(Default)]
pub struct BatchScheduler {
    runs: Mutex<HashMap<String, JoinHandle<RunReport>>>,
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run in the background. Handles of runs that have already
    /// ended are dropped here, so `wait` only sees runs started since.
    pub async fn submit(&self, runner: Arc<BatchRunner>, job: BatchJob) {
        let operation_id = job.operation_id.clone();
        let handle = tokio::spawn(async move { runner.run(job).await });

        let mut runs = self.runs.lock().await;
        runs.retain(|_, handle| !handle.is_finished());
        runs.insert(operation_id, handle);
    }

    /// Await a specific run. `None` if it was never submitted, was already
    /// reaped, or panicked.
    pub async fn wait(&self, operation_id: &str) -> Option<RunReport> {
        let handle = self.runs.lock().await.remove(operation_id)?;
        join(operation_id, handle).await
    }

    /// Number of runs still executing.
    pub async fn in_flight(&self) -> usize {
        self.runs
            .lock()
            .await
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Operation ids of runs still executing.
    pub async fn in_flight_ids(&self) -> Vec<String> {
        self.runs
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Await every outstanding run.
    pub async fn drain(&self) -> Vec<RunReport> {
        let runs: Vec<_> = self.runs.lock().await.drain().collect();

        let mut reports = Vec::with_capacity(runs.len());
        for (operation_id, handle) in runs {
            if let Some(report) = join(&operation_id, handle).await {
                reports.push(report);
            }
        }
        reports
    }
}

async fn join(operation_id: &str, handle: JoinHandle<RunReport>) -> Option<RunReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(operation_id, error = %e, "Batch run task failed");
            None
        }
    }
}
