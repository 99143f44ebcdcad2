// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job submission port used by the rules engine.

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::{ChatId, EnqueueOutcome, MsgId, TopicId};

/// Schedules side effects for asynchronous execution.
///
/// Submission only persists the job; the backend call happens later in a
/// worker, subject to deduplication and rate limiting.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Mark a chat (or topic) as read after a short debounce.
    ///
    /// Repeated calls for the same scope collapse into one execution that
    /// carries the latest `max_id`.
    async fn enqueue_mark_read(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    ) -> Result<EnqueueOutcome, TidyreadError>;

    /// React to a message with `emoji`.
    async fn enqueue_reaction(
        &self,
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: &str,
    ) -> Result<EnqueueOutcome, TidyreadError>;
}
