// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rule service: turns inbound messages into read and reaction jobs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use tidyread_config::model::RulesConfig;
use tidyread_core::types::{
    ActionLog, AutoReactConfig, ChatId, EventKind, Message, RuleType, SystemEvent, TopicId,
};
use tidyread_core::{AuditSink, ChatBackend, EventHandler, JobSubmitter, TidyreadError};

use crate::cache::AlbumCache;
use crate::checker::GlobalChecker;
use crate::resolver::RuleResolver;
use crate::{REASON_AUTOREACT_RULE, REASON_AUTOREAD_RULE};

/// What the service decided for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decision {
    /// Reason the chat was queued for reading.
    pub read_reason: Option<String>,
    /// Emoji queued as a reaction.
    pub reaction: Option<String>,
}

pub struct RuleService {
    resolver: Arc<RuleResolver>,
    checker: Arc<GlobalChecker>,
    backend: Arc<dyn ChatBackend>,
    jobs: Arc<dyn JobSubmitter>,
    audit: Arc<dyn AuditSink>,
    albums: AlbumCache,
    config: RulesConfig,
}

impl RuleService {
    pub fn new(
        resolver: Arc<RuleResolver>,
        checker: Arc<GlobalChecker>,
        backend: Arc<dyn ChatBackend>,
        jobs: Arc<dyn JobSubmitter>,
        audit: Arc<dyn AuditSink>,
        config: RulesConfig,
    ) -> Self {
        Self {
            albums: AlbumCache::new(config.album_cache_capacity, config.album_window()),
            resolver,
            checker,
            backend,
            jobs,
            audit,
            config,
        }
    }

    /// Decide and submit the read and reaction jobs for a `message` event.
    ///
    /// The two decisions are independent: a failure in one is logged and the
    /// other still runs. The first error is returned after both ran.
    pub async fn handle_new_message_event(
        &self,
        event: &SystemEvent,
    ) -> Result<Decision, TidyreadError> {
        let (Some(chat_id), EventKind::Message, Some(message)) =
            (event.chat_id, event.kind, event.message.as_ref())
        else {
            return Ok(Decision::default());
        };

        let read = self.decide_read(event, chat_id, message).await;
        let react = self.decide_reaction(event, chat_id, message).await;

        let mut decision = Decision::default();
        let mut first_error = None;
        match read {
            Ok(reason) => decision.read_reason = reason,
            Err(e) => {
                warn!(chat_id, msg_id = message.id, error = %e, "autoread decision failed");
                first_error = Some(e);
            }
        }
        match react {
            Ok(emoji) => decision.reaction = emoji,
            Err(e) => {
                warn!(chat_id, msg_id = message.id, error = %e, "autoreact decision failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(decision),
        }
    }

    async fn decide_read(
        &self,
        event: &SystemEvent,
        chat_id: ChatId,
        message: &Message,
    ) -> Result<Option<String>, TidyreadError> {
        let topic_id = event.topic_id;
        let rule = self
            .resolver
            .get_rule(chat_id, topic_id, RuleType::Autoread)
            .await?;

        let reason = match rule {
            Some(_) => REASON_AUTOREAD_RULE.to_string(),
            None => {
                let Some(reason) = self.checker.check(message, 1).await else {
                    return Ok(None);
                };
                if self.config.verify_unread_count
                    && !self.single_unread(chat_id, topic_id).await
                {
                    debug!(chat_id, ?topic_id, %reason, "heuristic read cancelled by live unread count");
                    return Ok(None);
                }
                reason
            }
        };

        self.jobs
            .enqueue_mark_read(chat_id, topic_id, Some(message.id))
            .await?;
        event.read.mark();
        info!(chat_id, ?topic_id, max_id = message.id, %reason, "autoread queued");
        self.log_action("autoread", event, chat_id, &reason).await;
        Ok(Some(reason))
    }

    /// Whether the live unread count of the scope is at most 1.
    ///
    /// A failed lookup counts as "not single" so a heuristic never reads blind.
    async fn single_unread(&self, chat_id: ChatId, topic_id: Option<TopicId>) -> bool {
        let count = match topic_id {
            Some(topic) => self.backend.get_unread_topics(chat_id).await.map(|topics| {
                topics
                    .iter()
                    .find(|t| t.id == topic)
                    .map_or(0, |t| t.unread_count)
            }),
            None => self.backend.get_chat(chat_id).await.map(|chat| chat.unread_count),
        };
        match count {
            Ok(n) => n <= 1,
            Err(e) => {
                warn!(chat_id, ?topic_id, error = %e, "unread count lookup failed");
                false
            }
        }
    }

    async fn decide_reaction(
        &self,
        event: &SystemEvent,
        chat_id: ChatId,
        message: &Message,
    ) -> Result<Option<String>, TidyreadError> {
        if message.is_outgoing {
            return Ok(None);
        }

        let Some(rule) = self
            .resolver
            .get_rule(chat_id, event.topic_id, RuleType::Autoreact)
            .await?
        else {
            return Ok(None);
        };

        let config = AutoReactConfig::from_config(&rule.config, &self.config.default_reaction_emoji);
        if !config.targets(message.sender_id) {
            return Ok(None);
        }

        // The album is claimed only once a reaction is actually due.
        if let Some(grouped_id) = message.grouped_id
            && !self.albums.claim(chat_id, grouped_id)
        {
            debug!(chat_id, grouped_id, msg_id = message.id, "album already handled");
            return Ok(None);
        }
        if message.has_own_reaction(&config.emoji) {
            debug!(chat_id, msg_id = message.id, emoji = %config.emoji, "already reacted");
            return Ok(None);
        }

        if let Err(e) = self
            .jobs
            .enqueue_reaction(chat_id, message.id, &config.emoji)
            .await
        {
            if let Some(grouped_id) = message.grouped_id {
                self.albums.release(chat_id, grouped_id);
            }
            return Err(e);
        }
        info!(chat_id, msg_id = message.id, emoji = %config.emoji, "autoreact queued");
        self.log_action("autoreact", event, chat_id, REASON_AUTOREACT_RULE)
            .await;
        Ok(Some(config.emoji))
    }

    async fn log_action(&self, action: &str, event: &SystemEvent, chat_id: ChatId, reason: &str) {
        let entry = ActionLog::now(action, chat_id, event.chat_name.clone(), reason, event.link.clone());
        if let Err(e) = self.audit.add_log(entry).await {
            warn!(chat_id, action, error = %e, "failed to write audit log");
        }
    }
}

#[async_trait]
impl EventHandler for RuleService {
    fn name(&self) -> &str {
        "rule_service"
    }

    async fn handle(&self, event: &SystemEvent) -> Result<(), TidyreadError> {
        self.handle_new_message_event(event).await.map(|_| ())
    }
}
