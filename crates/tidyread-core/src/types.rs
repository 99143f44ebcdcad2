// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types exchanged across the port traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Backend chat identifier.
pub type ChatId = i64;
/// Forum topic identifier inside a chat.
pub type TopicId = i64;
/// Message identifier inside a chat.
pub type MsgId = i64;
/// Backend user identifier.
pub type UserId = i64;

/// Free-form rule configuration stored as a JSON object.
pub type RuleConfig = serde_json::Map<String, serde_json::Value>;

/// Emoji used for AUTOREACT rules whose config names none.
pub const DEFAULT_REACTION_EMOJI: &str = "💩";

/// Kind of automation a rule requests.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RuleType {
    Autoread,
    Autoreact,
}

/// A persisted automation rule.
///
/// A row's existence for `(chat_id, topic_id, rule_type)` means the rule is
/// enabled. There is no separate flag; disabling deletes the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub owner_id: i64,
    pub rule_type: RuleType,
    pub chat_id: ChatId,
    /// `None` scopes the rule to the whole chat.
    pub topic_id: Option<TopicId>,
    pub config: RuleConfig,
    pub created_at: String,
    pub updated_at: String,
}

/// A rule that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRule {
    pub owner_id: i64,
    pub rule_type: RuleType,
    pub chat_id: ChatId,
    pub topic_id: Option<TopicId>,
    pub config: RuleConfig,
}

/// Typed view over an AUTOREACT rule's config map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoReactConfig {
    pub emoji: String,
    /// Empty means "react to every sender".
    pub target_users: Vec<UserId>,
}

impl AutoReactConfig {
    /// Decode the config of an AUTOREACT rule, falling back to `default_emoji`.
    ///
    /// `target_users` entries may be numbers or numeric strings; anything else
    /// is ignored.
    pub fn from_config(config: &RuleConfig, default_emoji: &str) -> Self {
        let emoji = config
            .get("emoji")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(default_emoji)
            .to_string();

        let target_users = config
            .get("target_users")
            .and_then(|v| v.as_array())
            .map(|users| {
                users
                    .iter()
                    .filter_map(|u| match u {
                        serde_json::Value::Number(n) => n.as_i64(),
                        serde_json::Value::String(s) => s.trim().parse().ok(),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            emoji,
            target_users,
        }
    }

    /// Whether a message from `sender` qualifies for the reaction.
    pub fn targets(&self, sender: Option<UserId>) -> bool {
        if self.target_users.is_empty() {
            return true;
        }
        sender.is_some_and(|id| self.target_users.contains(&id))
    }
}

/// A reaction currently attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    #[serde(default)]
    pub custom_emoji_id: Option<i64>,
    #[serde(default)]
    pub is_chosen_by_self: bool,
}

/// The subset of a backend message the rules engine consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MsgId,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub sender_username: Option<String>,
    #[serde(default)]
    pub is_outgoing: bool,
    #[serde(default)]
    pub is_service: bool,
    #[serde(default)]
    pub is_poll: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub grouped_id: Option<i64>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Whether we already reacted with `emoji` (plain emoji or custom emoji id).
    pub fn has_own_reaction(&self, emoji: &str) -> bool {
        self.reactions.iter().filter(|r| r.is_chosen_by_self).any(|r| {
            r.emoji == emoji
                || r
                    .custom_emoji_id
                    .is_some_and(|id| id.to_string() == emoji)
        })
    }
}

/// Kind of backend notification wrapped in a [`SystemEvent`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Message,
    Edited,
    Deleted,
    Action,
}

/// Shared "already read" marker carried by a [`SystemEvent`].
///
/// Clones share the same flag, so a handler that marks the event read is
/// observed by every other holder of the event.
#[derive(Debug, Clone, Default)]
pub struct ReadFlag(Arc<AtomicBool>);

impl ReadFlag {
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A normalized backend notification delivered through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub kind: EventKind,
    #[serde(default)]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub topic_id: Option<TopicId>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub chat_name: String,
    #[serde(default)]
    pub topic_name: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(skip)]
    pub read: ReadFlag,
}

impl SystemEvent {
    /// Build a `message` event for `chat_id`.
    pub fn new_message(chat_id: ChatId, chat_name: impl Into<String>, message: Message) -> Self {
        Self {
            kind: EventKind::Message,
            chat_id: Some(chat_id),
            topic_id: None,
            message: Some(message),
            chat_name: chat_name.into(),
            topic_name: None,
            link: format!("/chat/{chat_id}"),
            read: ReadFlag::default(),
        }
    }

    /// Scope the event to a forum topic.
    pub fn in_topic(mut self, topic_id: TopicId) -> Self {
        self.topic_id = Some(topic_id);
        if let Some(chat_id) = self.chat_id {
            self.link = format!("/forum/{chat_id}/topic/{topic_id}");
        }
        self
    }

    /// Whether a handler has already marked this event as read.
    pub fn is_read(&self) -> bool {
        self.read.get()
    }
}

/// Kind of chat as reported by the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatType {
    User,
    Group,
    Channel,
    Forum,
}

/// A chat (dialog) summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub unread_count: i64,
    pub chat_type: ChatType,
    #[serde(default)]
    pub unread_topics_count: Option<i64>,
}

/// A forum topic summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub unread_count: i64,
}

/// Selection passed to [`ChatBackend::get_messages`](crate::ChatBackend::get_messages).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    pub chat_id: ChatId,
    pub topic_id: Option<TopicId>,
    /// Fetch exactly these ids; `None` means "newest first".
    pub ids: Option<Vec<MsgId>>,
    pub limit: Option<usize>,
}

impl MessageQuery {
    /// The newest `limit` messages of a chat or topic.
    pub fn latest(chat_id: ChatId, topic_id: Option<TopicId>, limit: usize) -> Self {
        Self {
            chat_id,
            topic_id,
            ids: None,
            limit: Some(limit),
        }
    }

    /// Specific messages by id.
    pub fn by_ids(chat_id: ChatId, ids: Vec<MsgId>) -> Self {
        Self {
            chat_id,
            topic_id: None,
            ids: Some(ids),
            limit: None,
        }
    }
}

/// One audit log entry recording why an automation fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub action: String,
    pub chat_id: ChatId,
    pub chat_name: String,
    pub reason: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub link: String,
}

impl ActionLog {
    /// Create an entry stamped with the current time.
    pub fn now(
        action: impl Into<String>,
        chat_id: ChatId,
        chat_name: impl Into<String>,
        reason: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            chat_id,
            chat_name: chat_name.into(),
            reason: reason.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            link: link.into(),
        }
    }
}

/// User-wide autoread heuristics, owned by the settings UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalUserSettings {
    #[serde(default)]
    pub autoread_service_messages: bool,
    #[serde(default)]
    pub autoread_polls: bool,
    #[serde(default)]
    pub autoread_self: bool,
    /// Comma-separated usernames, `@` prefix optional.
    #[serde(default)]
    pub autoread_bots: String,
    #[serde(default)]
    pub autoread_regex: String,
}

/// Result of submitting a job to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnqueueOutcome {
    /// A new execution was scheduled.
    Created,
    /// Merged into a pending execution, which now carries the newest args.
    Coalesced,
    /// Dropped: an equivalent job is pending or ran recently.
    Duplicate,
}

/// Dedup id of the mark-read job for a chat or topic, e.g. `read_100_none`.
pub fn read_dedup_id(chat_id: ChatId, topic_id: Option<TopicId>) -> String {
    match topic_id {
        Some(topic) => format!("read_{chat_id}_{topic}"),
        None => format!("read_{chat_id}_none"),
    }
}

/// Dedup id of a reaction job, e.g. `react_200_17_👍`.
pub fn reaction_dedup_id(chat_id: ChatId, msg_id: MsgId, emoji: &str) -> String {
    format!("react_{chat_id}_{msg_id}_{emoji}")
}

/// Current UNIX time in fractional seconds.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
