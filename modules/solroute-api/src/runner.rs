//! Batch operation runner.
//!
//! Posts an ordered list of comments against one target, one fresh platform
//! session per comment, pausing a random delay before each submission. The
//! operation's stored status is checked before every step; once it is no
//! longer `ongoing` the run stops and leaves the row alone.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::traits::{Automation, OperationStore, Sleeper};

/// Inclusive range of whole seconds to wait before each submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_secs: u64,
    max_secs: u64,
}

impl DelayRange {
    /// `None` when `min_secs > max_secs`.
    pub fn new(min_secs: u64, max_secs: u64) -> Option<Self> {
        (min_secs <= max_secs).then_some(Self { min_secs, max_secs })
    }

    pub fn fixed(secs: u64) -> Self {
        Self {
            min_secs: secs,
            max_secs: secs,
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }

    /// Draw a delay uniformly from the range. A degenerate range is returned as-is.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_secs == self.max_secs {
            return Duration::from_secs(self.min_secs);
        }
        Duration::from_secs(rng.random_range(self.min_secs..=self.max_secs))
    }
}

#[derive(Debug, Clone)]
pub struct BatchJob {
    pub operation_id: String,
    pub target: String,
    pub comments: Vec<String>,
    pub delay: DelayRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every comment was attempted and the operation was marked finished.
    Completed,
    /// The operation went inactive (or its status could not be read) mid-run.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub operation_id: String,
    pub submitted: usize,
    pub failed: usize,
    pub outcome: RunOutcome,
}

pub struct BatchRunner {
    operations: Arc<dyn OperationStore>,
    automation: Arc<dyn Automation>,
    sleeper: Arc<dyn Sleeper>,
}

impl BatchRunner {
    pub fn new(
        operations: Arc<dyn OperationStore>,
        automation: Arc<dyn Automation>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            operations,
            automation,
            sleeper,
        }
    }

    pub async fn run(&self, job: BatchJob) -> RunReport {
        let operation_id = job.operation_id.as_str();
        let mut submitted = 0;
        let mut failed = 0;

        info!(
            operation_id,
            target = %job.target,
            comments = job.comments.len(),
            min_delay_secs = job.delay.min().as_secs(),
            max_delay_secs = job.delay.max().as_secs(),
            "Batch run starting"
        );

        for (step, comment) in job.comments.iter().enumerate() {
            match self.operations.is_active(operation_id).await {
                Ok(true) => {}
                Ok(false) => {
                    info!(operation_id, step, submitted, "Operation no longer active, stopping");
                    return report(&job, submitted, failed, RunOutcome::Stopped);
                }
                Err(e) => {
                    error!(operation_id, step, error = %e, "Failed to check operation status, stopping");
                    return report(&job, submitted, failed, RunOutcome::Stopped);
                }
            }

            let mut session = match self.automation.authenticate().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(operation_id, step, error = %e, "Failed to start platform session");
                    failed += 1;
                    continue;
                }
            };

            let delay = {
                let mut rng = rand::rng();
                job.delay.sample(&mut rng)
            };
            debug!(operation_id, step, delay_secs = delay.as_secs(), "Waiting before submission");
            self.sleeper.sleep(delay).await;

            match session.post_comment(&job.target, comment, None).await {
                Ok(()) => submitted += 1,
                Err(e) => {
                    warn!(operation_id, step, error = %e, "Failed to post comment");
                    failed += 1;
                }
            }
        }

        match self.operations.finish(operation_id).await {
            Ok(true) => {}
            Ok(false) => debug!(operation_id, "Operation was already finished"),
            Err(e) => error!(operation_id, error = %e, "Failed to mark operation finished"),
        }

        info!(operation_id, submitted, failed, "Batch run complete");
        report(&job, submitted, failed, RunOutcome::Completed)
    }
}

fn report(job: &BatchJob, submitted: usize, failed: usize, outcome: RunOutcome) -> RunReport {
    RunReport {
        operation_id: job.operation_id.clone(),
        submitted,
        failed,
        outcome,
    }
}
