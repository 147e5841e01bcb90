//! One-shot job scheduling.
//!
//! The notifier only needs "run this once at time T" from a scheduler. Once a
//! job is accepted its fate belongs to the scheduler: there is no
//! cancellation and no delivery confirmation.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use uuid::Uuid;

use yppf_common::{AppError, AppResult};

/// A unit of deferred work.
pub struct ScheduledJob {
    pub id: Uuid,
    pub name: String,
    pub run_at: DateTime<Utc>,
    pub task: BoxFuture<'static, ()>,
}

impl ScheduledJob {
    pub fn new(
        name: impl Into<String>,
        run_at: DateTime<Utc>,
        task: BoxFuture<'static, ()>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            run_at,
            task,
        }
    }
}

impl std::fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("run_at", &self.run_at)
            .finish_non_exhaustive()
    }
}

/// Anything that can run a job once at a given time.
pub trait JobScheduler: Send + Sync {
    /// Register `job`. `Ok` means accepted, not executed.
    fn schedule_once(&self, job: ScheduledJob) -> AppResult<()>;
}

/// Runs jobs as tasks on a tokio runtime, each sleeping until its target time.
///
/// Jobs whose time has already passed run as soon as the runtime polls them.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Bind to the runtime of the calling context.
    pub fn new() -> AppResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| AppError::Scheduler(format!("no tokio runtime available: {e}")))?;
        Ok(Self { handle })
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl JobScheduler for TokioScheduler {
    fn schedule_once(&self, job: ScheduledJob) -> AppResult<()> {
        let ScheduledJob {
            id,
            name,
            run_at,
            task,
        } = job;
        let delay = (run_at - Utc::now()).to_std().unwrap_or_default();

        tracing::debug!(job_id = %id, job = %name, run_at = %run_at, "Job scheduled");

        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(job_id = %id, job = %name, "Running scheduled job");
            task.await;
        });
        Ok(())
    }
}
