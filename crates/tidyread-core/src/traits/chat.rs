// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat backend port (the messaging account we automate).

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::{Chat, ChatId, Message, MessageQuery, MsgId, Topic, TopicId};

/// Access to the user's messaging account.
///
/// Implementations map platform failures onto [`TidyreadError::RateLimited`],
/// [`TidyreadError::NotConnected`] and [`TidyreadError::Rejected`] so the job
/// worker can tell them apart.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether the account session is currently usable.
    async fn is_connected(&self) -> bool;

    /// Look up a single chat summary.
    async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, TidyreadError>;

    /// Fetch messages, newest first unless explicit ids are requested.
    async fn get_messages(&self, query: MessageQuery) -> Result<Vec<Message>, TidyreadError>;

    /// Every chat with unread messages or unread forum topics.
    async fn get_all_unread_chats(&self) -> Result<Vec<Chat>, TidyreadError>;

    /// Topics of a forum chat that have unread messages.
    async fn get_unread_topics(&self, chat_id: ChatId) -> Result<Vec<Topic>, TidyreadError>;

    /// All topics of a forum chat.
    async fn get_forum_topics(&self, chat_id: ChatId) -> Result<Vec<Topic>, TidyreadError>;

    /// Mark a chat, or one topic of a forum, as read.
    ///
    /// With `max_id` set only messages up to and including that id are
    /// acknowledged; without it the whole history is.
    async fn mark_as_read(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    ) -> Result<(), TidyreadError>;

    /// Put `emoji` on a message. Returns `false` when the backend declined
    /// without raising (e.g. reactions disabled in that chat).
    async fn send_reaction(
        &self,
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: &str,
    ) -> Result<bool, TidyreadError>;
}
