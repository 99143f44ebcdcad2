// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat backend for deterministic testing.
//!
//! Chats, topics and messages are seeded by the test. Side effects
//! (`mark_as_read`, `send_reaction`) are captured with the instant they
//! happened, and failures can be queued per operation.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use tidyread_core::types::{
    Chat, ChatId, ChatType, Message, MessageQuery, MsgId, Topic, TopicId,
};
use tidyread_core::{ChatBackend, TidyreadError};

/// Backend operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    GetChat,
    GetMessages,
    GetUnreadChats,
    GetUnreadTopics,
    GetForumTopics,
    MarkAsRead,
    SendReaction,
}

/// A failure to return from a scripted operation.
#[derive(Debug, Clone, PartialEq)]
pub enum MockFailure {
    RateLimited(Duration),
    NotConnected,
    Rejected(String),
    Backend(String),
}

impl MockFailure {
    fn to_error(&self) -> TidyreadError {
        match self {
            Self::RateLimited(wait) => TidyreadError::RateLimited { wait: *wait },
            Self::NotConnected => TidyreadError::NotConnected,
            Self::Rejected(message) => TidyreadError::rejected(message.clone()),
            Self::Backend(message) => TidyreadError::backend(message.clone()),
        }
    }
}

/// A successful `mark_as_read` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCall {
    pub chat_id: ChatId,
    pub topic_id: Option<TopicId>,
    pub max_id: Option<MsgId>,
    pub at: Instant,
}

/// A successful `send_reaction` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionCall {
    pub chat_id: ChatId,
    pub msg_id: MsgId,
    pub emoji: String,
    pub at: Instant,
}

#[derive(Default)]
struct State {
    connected: bool,
    reactions_enabled: bool,
    chats: BTreeMap<ChatId, Chat>,
    unread_topics: HashMap<ChatId, Vec<Topic>>,
    forum_topics: HashMap<ChatId, Vec<Topic>>,
    messages: HashMap<ChatId, Vec<(Option<TopicId>, Message)>>,
    failures: HashMap<BackendOp, VecDeque<MockFailure>>,
    attempts: HashMap<BackendOp, usize>,
    reads: Vec<ReadCall>,
    reactions: Vec<ReactionCall>,
    call_latency: Duration,
}

/// A scripted [`ChatBackend`].
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    /// A connected backend with no chats.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                connected: true,
                reactions_enabled: true,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
    }

    /// When disabled, `send_reaction` returns `Ok(false)`.
    pub fn set_reactions_enabled(&self, enabled: bool) {
        self.state().reactions_enabled = enabled;
    }

    /// Delay applied before every `mark_as_read` and `send_reaction` call.
    pub fn set_call_latency(&self, latency: Duration) {
        self.state().call_latency = latency;
    }

    pub fn add_chat(&self, chat: Chat) {
        self.state().chats.insert(chat.id, chat);
    }

    /// Register a forum chat with its unread topics.
    pub fn add_forum(&self, id: ChatId, name: &str, unread_topics: Vec<Topic>) {
        let unread: i64 = unread_topics.iter().map(|t| t.unread_count).sum();
        let count = unread_topics.iter().filter(|t| t.unread_count > 0).count() as i64;
        self.add_chat(Chat {
            id,
            name: name.to_string(),
            unread_count: unread,
            chat_type: ChatType::Forum,
            unread_topics_count: Some(count),
        });
        self.set_unread_topics(id, unread_topics);
    }

    pub fn set_unread_topics(&self, chat_id: ChatId, topics: Vec<Topic>) {
        self.state().unread_topics.insert(chat_id, topics);
    }

    pub fn set_forum_topics(&self, chat_id: ChatId, topics: Vec<Topic>) {
        self.state().forum_topics.insert(chat_id, topics);
    }

    pub fn add_message(&self, chat_id: ChatId, topic_id: Option<TopicId>, message: Message) {
        self.state()
            .messages
            .entry(chat_id)
            .or_default()
            .push((topic_id, message));
    }

    /// Make the next `times` calls of `op` fail with `failure`.
    pub fn push_failures(&self, op: BackendOp, failure: MockFailure, times: usize) {
        let mut state = self.state();
        let queue = state.failures.entry(op).or_default();
        queue.extend(std::iter::repeat_n(failure, times));
    }

    /// Calls of `op`, failed ones included.
    pub fn attempts(&self, op: BackendOp) -> usize {
        self.state().attempts.get(&op).copied().unwrap_or(0)
    }

    pub fn reads(&self) -> Vec<ReadCall> {
        self.state().reads.clone()
    }

    pub fn reactions(&self) -> Vec<ReactionCall> {
        self.state().reactions.clone()
    }

    /// Poll `condition` every 10 ms until it holds or `timeout` elapses.
    pub async fn wait_for(&self, timeout: Duration, condition: impl Fn(&Self) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition(self) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn simulate_latency(&self) {
        let latency = self.state().call_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Count the attempt and pop a scripted failure, if any.
    fn enter(&self, op: BackendOp) -> Result<(), TidyreadError> {
        let mut state = self.state();
        *state.attempts.entry(op).or_default() += 1;
        match state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn get_chat(&self, chat_id: ChatId) -> Result<Chat, TidyreadError> {
        self.enter(BackendOp::GetChat)?;
        self.state()
            .chats
            .get(&chat_id)
            .cloned()
            .ok_or_else(|| TidyreadError::NotFound {
                what: format!("chat {chat_id}"),
            })
    }

    async fn get_messages(&self, query: MessageQuery) -> Result<Vec<Message>, TidyreadError> {
        self.enter(BackendOp::GetMessages)?;
        let state = self.state();
        let stored = state.messages.get(&query.chat_id).cloned().unwrap_or_default();

        if let Some(ids) = &query.ids {
            return Ok(stored
                .into_iter()
                .map(|(_, m)| m)
                .filter(|m| ids.contains(&m.id))
                .collect());
        }

        let mut messages: Vec<Message> = stored
            .into_iter()
            .filter(|(topic, _)| query.topic_id.is_none() || *topic == query.topic_id)
            .map(|(_, m)| m)
            .collect();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = query.limit {
            messages.truncate(limit);
        }
        Ok(messages)
    }

    async fn get_all_unread_chats(&self) -> Result<Vec<Chat>, TidyreadError> {
        self.enter(BackendOp::GetUnreadChats)?;
        Ok(self
            .state()
            .chats
            .values()
            .filter(|c| c.unread_count > 0 || c.unread_topics_count.unwrap_or(0) > 0)
            .cloned()
            .collect())
    }

    async fn get_unread_topics(&self, chat_id: ChatId) -> Result<Vec<Topic>, TidyreadError> {
        self.enter(BackendOp::GetUnreadTopics)?;
        Ok(self
            .state()
            .unread_topics
            .get(&chat_id)
            .map(|topics| topics.iter().filter(|t| t.unread_count > 0).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_forum_topics(&self, chat_id: ChatId) -> Result<Vec<Topic>, TidyreadError> {
        self.enter(BackendOp::GetForumTopics)?;
        Ok(self
            .state()
            .forum_topics
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_as_read(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        max_id: Option<MsgId>,
    ) -> Result<(), TidyreadError> {
        self.simulate_latency().await;
        self.enter(BackendOp::MarkAsRead)?;
        let mut state = self.state();
        if !state.connected {
            return Err(TidyreadError::NotConnected);
        }
        state.reads.push(ReadCall {
            chat_id,
            topic_id,
            max_id,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn send_reaction(
        &self,
        chat_id: ChatId,
        msg_id: MsgId,
        emoji: &str,
    ) -> Result<bool, TidyreadError> {
        self.simulate_latency().await;
        self.enter(BackendOp::SendReaction)?;
        let mut state = self.state();
        if !state.connected {
            return Err(TidyreadError::NotConnected);
        }
        if !state.reactions_enabled {
            return Ok(false);
        }
        state.reactions.push(ReactionCall {
            chat_id,
            msg_id,
            emoji: emoji.to_string(),
            at: Instant::now(),
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: i64) -> Message {
        Message {
            id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn latest_messages_are_newest_first() {
        let backend = MockBackend::new();
        backend.add_message(1, None, msg(3));
        backend.add_message(1, None, msg(9));
        backend.add_message(1, Some(4), msg(5));

        let latest = backend.get_messages(MessageQuery::latest(1, None, 2)).await.unwrap();
        assert_eq!(latest.iter().map(|m| m.id).collect::<Vec<_>>(), vec![9, 5]);

        let topic = backend.get_messages(MessageQuery::latest(1, Some(4), 5)).await.unwrap();
        assert_eq!(topic.len(), 1);

        let by_id = backend.get_messages(MessageQuery::by_ids(1, vec![3])).await.unwrap();
        assert_eq!(by_id, vec![msg(3)]);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let backend = MockBackend::new();
        backend.push_failures(
            BackendOp::SendReaction,
            MockFailure::RateLimited(Duration::from_secs(3)),
            1,
        );
        backend.push_failures(BackendOp::SendReaction, MockFailure::Backend("x".into()), 1);

        let first = backend.send_reaction(1, 2, "👍").await.unwrap_err();
        assert!(matches!(first, TidyreadError::RateLimited { .. }));
        let second = backend.send_reaction(1, 2, "👍").await.unwrap_err();
        assert!(matches!(second, TidyreadError::Backend { .. }));
        assert!(backend.send_reaction(1, 2, "👍").await.unwrap());

        assert_eq!(backend.attempts(BackendOp::SendReaction), 3);
        assert_eq!(backend.reactions().len(), 1);
    }

    #[tokio::test]
    async fn disconnected_backend_refuses_side_effects() {
        let backend = MockBackend::new();
        backend.set_connected(false);
        assert!(!backend.is_connected().await);
        let err = backend.mark_as_read(1, None, None).await.unwrap_err();
        assert!(matches!(err, TidyreadError::NotConnected));
        assert!(backend.reads().is_empty());
    }

    #[tokio::test]
    async fn unread_chats_include_forums_with_unread_topics() {
        let backend = MockBackend::new();
        backend.add_chat(Chat {
            id: 1,
            name: "read".into(),
            unread_count: 0,
            chat_type: ChatType::User,
            unread_topics_count: None,
        });
        backend.add_forum(
            2,
            "forum",
            vec![Topic {
                id: 7,
                name: "t".into(),
                unread_count: 2,
            }],
        );
        let unread = backend.get_all_unread_chats().await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].chat_type, ChatType::Forum);
    }
}
