//! Inline or deferred execution of a send.
//!
//! `Dispatcher::Immediate` awaits the work and hands back its result.
//! `Dispatcher::Deferred` registers the work with a [`JobScheduler`] and
//! returns at once; success then only means "scheduled", never "delivered".

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use uuid::Uuid;

use yppf_common::config::WechatConfig;

use crate::scheduler::{JobScheduler, ScheduledJob};

/// Delay used when the caller does not choose a run time.
pub const DEFAULT_DEFER_SECS: i64 = 5;

/// When deferred work should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunAt {
    /// A few seconds from now.
    #[default]
    Soon,
    At(DateTime<Utc>),
    After(Duration),
}

impl RunAt {
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            RunAt::Soon => now + Duration::seconds(DEFAULT_DEFER_SECS),
            RunAt::At(at) => *at,
            RunAt::After(delay) => now + *delay,
        }
    }
}

/// What became of a dispatched piece of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched<T> {
    /// Ran inline.
    Completed(T),
    /// Accepted by the scheduler.
    Scheduled {
        job_id: Uuid,
        run_at: DateTime<Utc>,
    },
    /// The scheduler refused the job; the work was dropped.
    NotScheduled { error: String },
}

impl<T> Dispatched<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Dispatched::Completed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub enum Dispatcher {
    Immediate,
    Deferred {
        scheduler: Arc<dyn JobScheduler>,
        run_at: RunAt,
    },
}

impl Dispatcher {
    /// Defer only when the caller asks for it, configuration allows it and a
    /// scheduler is installed.
    pub fn select(
        requested: bool,
        config: &WechatConfig,
        scheduler: Option<&Arc<dyn JobScheduler>>,
        run_at: RunAt,
    ) -> Self {
        match scheduler {
            Some(scheduler) if requested && config.multithread => Dispatcher::Deferred {
                scheduler: Arc::clone(scheduler),
                run_at,
            },
            None if requested && config.multithread => {
                tracing::debug!("No job scheduler installed, sending inline");
                Dispatcher::Immediate
            }
            _ => Dispatcher::Immediate,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Dispatcher::Deferred { .. })
    }

    /// Run `task` inline or hand it to the scheduler.
    pub async fn dispatch<F>(&self, name: &str, task: F) -> Dispatched<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match self {
            Dispatcher::Immediate => Dispatched::Completed(task.await),
            Dispatcher::Deferred { scheduler, run_at } => {
                let run_at = run_at.resolve(Utc::now());
                let job = ScheduledJob::new(name, run_at, task.map(|_| ()).boxed());
                let job_id = job.id;

                match scheduler.schedule_once(job) {
                    Ok(()) => Dispatched::Scheduled { job_id, run_at },
                    Err(e) => {
                        tracing::warn!(job = %name, error = %e, "Failed to schedule job");
                        Dispatched::NotScheduled {
                            error: e.to_string(),
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatcher::Immediate => f.write_str("Immediate"),
            Dispatcher::Deferred { run_at, .. } => f
                .debug_struct("Deferred")
                .field("run_at", run_at)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use url::Url;
    use yppf_common::{AppError, AppResult};

    #[derive(Default)]
    struct RecordingScheduler {
        jobs: Mutex<Vec<ScheduledJob>>,
    }

    impl JobScheduler for RecordingScheduler {
        fn schedule_once(&self, job: ScheduledJob) -> AppResult<()> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    struct RefusingScheduler;

    impl JobScheduler for RefusingScheduler {
        fn schedule_once(&self, _job: ScheduledJob) -> AppResult<()> {
            Err(AppError::Scheduler("shutting down".to_string()))
        }
    }

    fn config(multithread: bool) -> WechatConfig {
        let mut config = WechatConfig::new(
            Url::parse("http://site.local/").unwrap(),
            Url::parse("http://wechat.local/").unwrap(),
            "k",
        );
        config.multithread = multithread;
        config
    }

    #[test]
    fn test_run_at_resolution() {
        let now = Utc::now();
        let at = now + Duration::hours(1);
        assert_eq!(RunAt::Soon.resolve(now), now + Duration::seconds(5));
        assert_eq!(RunAt::At(at).resolve(now), at);
        assert_eq!(
            RunAt::After(Duration::seconds(10)).resolve(now),
            now + Duration::seconds(10)
        );
    }

    #[test]
    fn test_select() {
        let scheduler: Arc<dyn JobScheduler> = Arc::new(RecordingScheduler::default());
        let on = config(true);
        let off = config(false);

        assert!(Dispatcher::select(true, &on, Some(&scheduler), RunAt::Soon).is_deferred());
        assert!(!Dispatcher::select(false, &on, Some(&scheduler), RunAt::Soon).is_deferred());
        assert!(!Dispatcher::select(true, &off, Some(&scheduler), RunAt::Soon).is_deferred());
        assert!(!Dispatcher::select(true, &on, None, RunAt::Soon).is_deferred());
    }

    #[tokio::test]
    async fn test_immediate_runs_inline() {
        let result = Dispatcher::Immediate.dispatch("add", async { 1 + 1 }).await;
        assert_eq!(result, Dispatched::Completed(2));
    }

    #[tokio::test]
    async fn test_deferred_registers_without_running() {
        let recorder = Arc::new(RecordingScheduler::default());
        let dispatcher = Dispatcher::Deferred {
            scheduler: recorder.clone(),
            run_at: RunAt::After(Duration::seconds(10)),
        };
        let runs = Arc::new(AtomicU32::new(0));

        let before = Utc::now();
        let counter = runs.clone();
        let result = dispatcher
            .dispatch("count", async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let after = Utc::now();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        let Dispatched::Scheduled { job_id, run_at } = result else {
            panic!("expected a scheduled job");
        };
        assert!(run_at >= before + Duration::seconds(10));
        assert!(run_at <= after + Duration::seconds(10));

        let job = recorder.jobs.lock().unwrap().pop().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.name, "count");
        assert_eq!(job.run_at, run_at);

        job.task.await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_job_is_reported() {
        let dispatcher = Dispatcher::Deferred {
            scheduler: Arc::new(RefusingScheduler),
            run_at: RunAt::Soon,
        };
        let result = dispatcher.dispatch("noop", async {}).await;
        assert!(matches!(
            result,
            Dispatched::NotScheduled { error } if error.contains("shutting down")
        ));
    }
}
