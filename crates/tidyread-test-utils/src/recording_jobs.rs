// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`JobSubmitter`] that records submissions instead of running them.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use tidyread_core::types::{ChatId, EnqueueOutcome, MsgId, TopicId};
use tidyread_core::{JobSubmitter, TidyreadError, reaction_dedup_id, read_dedup_id};

/// One recorded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedJob {
    MarkRead {
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    },
    Reaction {
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: String,
    },
}

impl SubmittedJob {
    pub fn dedup_id(&self) -> String {
        match self {
            Self::MarkRead {
                chat_id, topic_id, ..
            } => read_dedup_id(*chat_id, *topic_id),
            Self::Reaction {
                chat_id,
                msg_id,
                emoji,
            } => reaction_dedup_id(*chat_id, *msg_id, emoji),
        }
    }
}

struct State {
    submitted: Vec<SubmittedJob>,
    outcome: EnqueueOutcome,
    fail_mark_read: bool,
    fail_reaction: bool,
}

pub struct RecordingJobs {
    state: Mutex<State>,
}

impl RecordingJobs {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                submitted: Vec::new(),
                outcome: EnqueueOutcome::Created,
                fail_mark_read: false,
                fail_reaction: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn submitted(&self) -> Vec<SubmittedJob> {
        self.state().submitted.clone()
    }

    pub fn dedup_ids(&self) -> Vec<String> {
        self.state().submitted.iter().map(SubmittedJob::dedup_id).collect()
    }

    /// Outcome returned for every successful submission.
    pub fn set_outcome(&self, outcome: EnqueueOutcome) {
        self.state().outcome = outcome;
    }

    /// Reject mark-read submissions with a storage error.
    pub fn fail_mark_read(&self, fail: bool) {
        self.state().fail_mark_read = fail;
    }

    /// Reject reaction submissions with a storage error.
    pub fn fail_reaction(&self, fail: bool) {
        self.state().fail_reaction = fail;
    }
}

impl Default for RecordingJobs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobSubmitter for RecordingJobs {
    async fn enqueue_mark_read(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    ) -> Result<EnqueueOutcome, TidyreadError> {
        let mut state = self.state();
        if state.fail_mark_read {
            return Err(TidyreadError::Storage {
                source: "queue unavailable".into(),
            });
        }
        state.submitted.push(SubmittedJob::MarkRead {
            chat_id,
            topic_id,
            max_id,
        });
        Ok(state.outcome)
    }

    async fn enqueue_reaction(
        &self,
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: &str,
    ) -> Result<EnqueueOutcome, TidyreadError> {
        let mut state = self.state();
        if state.fail_reaction {
            return Err(TidyreadError::Storage {
                source: "queue unavailable".into(),
            });
        }
        state.submitted.push(SubmittedJob::Reaction {
            chat_id,
            msg_id,
            emoji: emoji.to_string(),
        });
        Ok(state.outcome)
    }
}
