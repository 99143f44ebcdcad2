// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job submission with per-kind dedup policies.

use async_trait::async_trait;
use tracing::debug;

use tidyread_config::model::QueueConfig;
use tidyread_core::types::{ChatId, EnqueueOutcome, MsgId, TopicId};
use tidyread_core::{JobSubmitter, TidyreadError, unix_now};
use tidyread_storage::queries::jobs;
use tidyread_storage::{Database, DedupPolicy, JobStatus};

use crate::job::{Job, JobCall};

/// Durable job queue backed by the `jobs` table.
///
/// Read jobs coalesce: one pending run per chat or topic, carrying the most
/// recent `max_id`. Reaction jobs are unique: a resubmission is dropped while
/// a run is pending, running or finished within `keep_result_secs`.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(db: Database, config: QueueConfig) -> Self {
        Self { db, config }
    }

    fn policy_for(&self, call: &JobCall) -> DedupPolicy {
        match call {
            JobCall::MarkAsRead { .. } => DedupPolicy::Coalesce,
            JobCall::SendReaction { .. } => DedupPolicy::Unique {
                keep_result_secs: self.config.keep_result_secs,
            },
        }
    }

    fn defer_for(&self, call: &JobCall) -> f64 {
        match call {
            JobCall::MarkAsRead { .. } => self.config.read_debounce_secs,
            JobCall::SendReaction { .. } => 0.0,
        }
    }

    /// Submit `call` as if the current time were `now`.
    pub async fn submit_at(&self, call: JobCall, now: f64) -> Result<EnqueueOutcome, TidyreadError> {
        let policy = self.policy_for(&call);
        let defer = self.defer_for(&call);
        self.submit_job(&call.into_job(defer), policy, now).await
    }

    /// Submit a job in its wire shape.
    pub async fn submit_job(
        &self,
        job: &Job,
        policy: DedupPolicy,
        now: f64,
    ) -> Result<EnqueueOutcome, TidyreadError> {
        let row = job.to_new_job(self.config.max_tries, now)?;
        let outcome = jobs::enqueue(&self.db, row, policy, now).await?;
        debug!(
            dedup_id = %job.dedup_id,
            function = %job.function_name,
            %outcome,
            "job submitted"
        );
        Ok(outcome)
    }

    /// Row counts per status.
    pub async fn stats(&self) -> Result<Vec<(JobStatus, i64)>, TidyreadError> {
        jobs::count_by_status(&self.db).await
    }
}

#[async_trait]
impl JobSubmitter for JobQueue {
    async fn enqueue_mark_read(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    ) -> Result<EnqueueOutcome, TidyreadError> {
        let call = JobCall::MarkAsRead {
            chat_id,
            topic_id,
            max_id,
        };
        self.submit_at(call, unix_now()).await
    }

    async fn enqueue_reaction(
        &self,
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: &str,
    ) -> Result<EnqueueOutcome, TidyreadError> {
        let call = JobCall::SendReaction {
            chat_id,
            msg_id,
            emoji: emoji.to_string(),
        };
        self.submit_at(call, unix_now()).await
    }
}
