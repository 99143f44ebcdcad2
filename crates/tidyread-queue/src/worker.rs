// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker pool draining the durable job table.
//!
//! Each worker claims one due job at a time. A claimed row stays locked for
//! `lock_timeout_secs`; if the process dies mid-run the lock lapses and
//! another worker picks the job up again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strum::{AsRefStr, Display};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tidyread_config::model::QueueConfig;
use tidyread_core::{TidyreadError, unix_now};
use tidyread_storage::queries::jobs;
use tidyread_storage::{Database, JobRecord};

use crate::dead_letter::DeadLetterLog;
use crate::executor::{Execution, JobExecutor};
use crate::flood::FloodGate;
use crate::job::JobCall;

/// Interval between maintenance passes.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

/// What happened to one claimed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    /// Completed, and new args arrived meanwhile; runs again.
    Rerun,
    /// Dropped without retry: backend rejection or a declined call.
    Skipped,
    /// Not attempted because the flood lock was held.
    FloodDeferred,
    /// This job hit the rate limit and engaged the flood lock.
    RateLimited,
    Disconnected,
    Retried,
    Dead,
}

pub struct WorkerPool {
    db: Database,
    executor: Arc<JobExecutor>,
    flood: FloodGate,
    dead_letters: DeadLetterLog,
    config: QueueConfig,
}

impl WorkerPool {
    pub fn new(db: Database, executor: Arc<JobExecutor>, config: QueueConfig) -> Self {
        Self {
            flood: FloodGate::new(db.clone(), config.flood_buffer_secs),
            dead_letters: DeadLetterLog::new(db.clone(), config.dead_letter_retention_secs),
            db,
            executor,
            config,
        }
    }

    /// Run `config.workers` workers plus a maintenance task until `cancel`
    /// fires, then wait up to `shutdown_grace` for in-flight jobs.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut tasks = JoinSet::new();
        for worker_id in 0..self.config.workers.max(1) {
            let pool = Arc::clone(&self);
            let cancel = cancel.clone();
            tasks.spawn(async move { pool.worker_loop(worker_id, cancel).await });
        }
        {
            let pool = Arc::clone(&self);
            let cancel = cancel.clone();
            tasks.spawn(async move { pool.maintenance_loop(cancel).await });
        }
        info!(workers = self.config.workers, "worker pool started");

        cancel.cancelled().await;
        info!("worker pool stopping, draining in-flight jobs");

        let grace = self.config.shutdown_grace();
        let drained = tokio::time::timeout(grace, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!(error = %e, "worker task panicked");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(grace_secs = grace.as_secs_f64(), "shutdown grace elapsed, aborting workers");
            tasks.abort_all();
        }
        info!("worker pool stopped");
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        debug!(worker_id, "worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.run_next(unix_now()).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => warn!(worker_id, error = %e, "job claim or bookkeeping failed"),
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
        debug!(worker_id, "worker stopped");
    }

    async fn maintenance_loop(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.maintain(unix_now()).await {
                        warn!(error = %e, "queue maintenance failed");
                    }
                }
            }
        }
    }

    /// Prune finished job rows and expired dead letters.
    pub async fn maintain(&self, now: f64) -> Result<(), TidyreadError> {
        let jobs_removed = jobs::prune_finished(&self.db, now - self.config.keep_result_secs).await?;
        let letters_removed = self.dead_letters.prune(now).await?;
        if jobs_removed + letters_removed > 0 {
            debug!(jobs_removed, letters_removed, "queue maintenance pruned rows");
        }
        Ok(())
    }

    /// Claim and process at most one due job.
    pub async fn run_next(&self, now: f64) -> Result<Option<JobOutcome>, TidyreadError> {
        let claimed = jobs::claim_due(&self.db, now, 1, self.config.lock_timeout_secs).await?;
        let Some(job) = claimed.into_iter().next() else {
            return Ok(None);
        };
        self.process(job, now).await.map(Some)
    }

    /// Process one claimed job picked up at time `now`.
    ///
    /// Bookkeeping after the backend call is stamped with `now` plus the
    /// call's latency, so a rate limit is measured from when it was reported.
    pub async fn process(&self, job: JobRecord, now: f64) -> Result<JobOutcome, TidyreadError> {
        let id = job.dedup_id.as_str();

        if let Some(left) = self.flood.remaining(now).await? {
            let run_at = now + left + self.flood.buffer_secs();
            jobs::reschedule(&self.db, id, run_at).await?;
            debug!(dedup_id = id, wait_secs = left, "flood lock held, job deferred");
            return Ok(self.finish(&job, JobOutcome::FloodDeferred));
        }

        let call = match JobCall::from_stored(&job.function_name, &job.args) {
            Ok(call) => call,
            Err(e) => return self.give_up(&job, &e.to_string(), now).await,
        };

        let started = Instant::now();
        let result = self.executor.execute(&call).await;
        let now = now + started.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(Execution::Done) => {
                if jobs::complete(&self.db, id, now).await? {
                    JobOutcome::Rerun
                } else {
                    JobOutcome::Completed
                }
            }
            Ok(Execution::Declined) => {
                jobs::complete(&self.db, id, now).await?;
                JobOutcome::Skipped
            }
            Err(TidyreadError::RateLimited { wait }) => {
                self.flood.engage(wait, now).await?;
                let run_at = now + wait.as_secs_f64() + self.flood.buffer_secs();
                jobs::reschedule(&self.db, id, run_at).await?;
                JobOutcome::RateLimited
            }
            Err(TidyreadError::NotConnected) => {
                jobs::reschedule(&self.db, id, now + self.config.not_connected_delay_secs).await?;
                debug!(dedup_id = id, "backend not connected, job deferred");
                JobOutcome::Disconnected
            }
            Err(TidyreadError::Rejected { message }) => {
                warn!(dedup_id = id, %message, "backend rejected job, skipping");
                jobs::complete(&self.db, id, now).await?;
                JobOutcome::Skipped
            }
            Err(e) => {
                let attempt = job.attempts + 1;
                if attempt < job.max_tries {
                    let delay = self.backoff(attempt);
                    jobs::retry(&self.db, id, now + delay, &e.to_string()).await?;
                    warn!(dedup_id = id, attempt, retry_in_secs = delay, error = %e, "job failed, retrying");
                    JobOutcome::Retried
                } else {
                    return self.give_up(&job, &e.to_string(), now).await;
                }
            }
        };
        Ok(self.finish(&job, outcome))
    }

    /// Delay before retry number `attempt` (1-based): base, 2*base, 4*base...
    fn backoff(&self, attempt: u32) -> f64 {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX).min(30);
        self.config.retry_base_secs * 2f64.powi(exp)
    }

    async fn give_up(
        &self,
        job: &JobRecord,
        reason: &str,
        now: f64,
    ) -> Result<JobOutcome, TidyreadError> {
        let written = jobs::bury(
            &self.db,
            &job.dedup_id,
            reason,
            now,
            self.dead_letters.retention_secs(),
        )
        .await?;
        if written {
            error!(
                job_id = %job.dedup_id,
                function = %job.function_name,
                error = reason,
                "job dead-lettered"
            );
            crate::metrics::record_dead_letter();
        }
        Ok(self.finish(job, JobOutcome::Dead))
    }

    fn finish(&self, job: &JobRecord, outcome: JobOutcome) -> JobOutcome {
        crate::metrics::record_job(&job.function_name, outcome.as_ref());
        outcome
    }
}
