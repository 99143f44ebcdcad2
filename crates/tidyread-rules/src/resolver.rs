// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule lookup and toggling.
//!
//! A rule is enabled exactly when its row exists. Toggling off deletes the
//! row; there is no stored flag to drift out of sync.

use std::sync::Arc;

use tracing::{debug, info};

use tidyread_core::types::{ChatId, NewRule, Rule, RuleConfig, RuleType, TopicId};
use tidyread_core::{ChatBackend, RuleRepository, TidyreadError};

pub struct RuleResolver {
    repo: Arc<dyn RuleRepository>,
    owner_id: i64,
}

impl RuleResolver {
    pub fn new(repo: Arc<dyn RuleRepository>, owner_id: i64) -> Self {
        Self { repo, owner_id }
    }

    /// The rule governing `(chat_id, topic_id)`.
    ///
    /// A topic-specific row wins; otherwise the chat-wide row applies.
    pub async fn get_rule(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        rule_type: RuleType,
    ) -> Result<Option<Rule>, TidyreadError> {
        if let Some(topic) = topic_id
            && let Some(rule) = self
                .repo
                .find_for_scope(chat_id, Some(topic), rule_type)
                .await?
        {
            return Ok(Some(rule));
        }
        self.repo.find_for_scope(chat_id, None, rule_type).await
    }

    /// Enable or disable the rule for exactly this scope.
    ///
    /// Enabling inserts a row (config defaults to `{}`) or, when `config` is
    /// given, replaces the config of the existing row. Disabling deletes the
    /// row. Returns the row after the change, `None` when disabled.
    pub async fn toggle_rule(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        rule_type: RuleType,
        enabled: bool,
        config: Option<RuleConfig>,
    ) -> Result<Option<Rule>, TidyreadError> {
        let existing = self.repo.find_for_scope(chat_id, topic_id, rule_type).await?;

        match (enabled, existing) {
            (true, None) => {
                let rule = self
                    .repo
                    .insert(NewRule {
                        owner_id: self.owner_id,
                        rule_type,
                        chat_id,
                        topic_id,
                        config: config.unwrap_or_default(),
                    })
                    .await?;
                info!(chat_id, ?topic_id, %rule_type, rule_id = rule.id, "rule enabled");
                Ok(Some(rule))
            }
            (true, Some(rule)) => match config {
                Some(config) => {
                    let updated = self.repo.update_config(rule.id, config).await?;
                    debug!(chat_id, ?topic_id, %rule_type, "rule config updated");
                    Ok(Some(updated))
                }
                None => Ok(Some(rule)),
            },
            (false, Some(rule)) => {
                self.repo.delete(rule.id).await?;
                info!(chat_id, ?topic_id, %rule_type, rule_id = rule.id, "rule disabled");
                Ok(None)
            }
            (false, None) => Ok(None),
        }
    }

    /// Toggle the chat-wide rule of a forum and the rule of each of its topics.
    ///
    /// Returns the number of scopes touched.
    pub async fn apply_to_all_topics(
        &self,
        backend: &dyn ChatBackend,
        forum_id: ChatId,
        rule_type: RuleType,
        enabled: bool,
    ) -> Result<usize, TidyreadError> {
        self.toggle_rule(forum_id, None, rule_type, enabled, None)
            .await?;
        let topics = backend.get_forum_topics(forum_id).await?;
        for topic in &topics {
            self.toggle_rule(forum_id, Some(topic.id), rule_type, enabled, None)
                .await?;
        }
        info!(forum_id, %rule_type, enabled, topics = topics.len(), "applied rule to all topics");
        Ok(topics.len() + 1)
    }

    pub async fn list_rules(&self) -> Result<Vec<Rule>, TidyreadError> {
        self.repo.list_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyread_core::types::Topic;
    use tidyread_test_utils::{MemoryStore, MockBackend};

    fn resolver() -> (RuleResolver, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RuleResolver::new(store.clone(), 1), store)
    }

    #[tokio::test]
    async fn toggle_on_then_off_leaves_no_rows() {
        let (resolver, store) = resolver();
        let rule = resolver
            .toggle_rule(10, Some(3), RuleType::Autoread, true, None)
            .await
            .unwrap();
        assert!(rule.is_some());
        assert_eq!(store.rule_count(), 1);

        let off = resolver
            .toggle_rule(10, Some(3), RuleType::Autoread, false, None)
            .await
            .unwrap();
        assert!(off.is_none());
        assert_eq!(store.rule_count(), 0);
        assert!(
            resolver
                .get_rule(10, Some(3), RuleType::Autoread)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn enabling_twice_keeps_one_row() {
        let (resolver, store) = resolver();
        for _ in 0..3 {
            resolver
                .toggle_rule(10, None, RuleType::Autoreact, true, None)
                .await
                .unwrap();
        }
        assert_eq!(store.rule_count(), 1);
    }

    #[tokio::test]
    async fn topic_rule_takes_precedence_over_chat_rule() {
        let (resolver, _store) = resolver();
        let chat_config = serde_json::json!({"emoji": "A"}).as_object().unwrap().clone();
        let topic_config = serde_json::json!({"emoji": "B"}).as_object().unwrap().clone();
        resolver
            .toggle_rule(200, None, RuleType::Autoreact, true, Some(chat_config))
            .await
            .unwrap();
        resolver
            .toggle_rule(200, Some(5), RuleType::Autoreact, true, Some(topic_config))
            .await
            .unwrap();

        let in_topic = resolver.get_rule(200, Some(5), RuleType::Autoreact).await.unwrap().unwrap();
        assert_eq!(in_topic.topic_id, Some(5));
        assert_eq!(in_topic.config["emoji"], "B");

        let other_topic = resolver.get_rule(200, Some(6), RuleType::Autoreact).await.unwrap().unwrap();
        assert_eq!(other_topic.topic_id, None);

        let chat_wide = resolver.get_rule(200, None, RuleType::Autoreact).await.unwrap().unwrap();
        assert_eq!(chat_wide.config["emoji"], "A");
    }

    #[tokio::test]
    async fn enabling_existing_rule_updates_config_only_when_given() {
        let (resolver, _store) = resolver();
        let first = serde_json::json!({"emoji": "🔥"}).as_object().unwrap().clone();
        resolver
            .toggle_rule(1, None, RuleType::Autoreact, true, Some(first))
            .await
            .unwrap();

        let unchanged = resolver
            .toggle_rule(1, None, RuleType::Autoreact, true, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.config["emoji"], "🔥");

        let second = serde_json::json!({"emoji": "👍"}).as_object().unwrap().clone();
        let changed = resolver
            .toggle_rule(1, None, RuleType::Autoreact, true, Some(second))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(changed.config["emoji"], "👍");
    }

    #[tokio::test]
    async fn apply_to_all_topics_covers_chat_and_topics() {
        let (resolver, store) = resolver();
        let backend = MockBackend::new();
        backend.set_forum_topics(
            -100,
            vec![
                Topic { id: 1, name: "General".into(), unread_count: 0 },
                Topic { id: 2, name: "News".into(), unread_count: 4 },
            ],
        );

        let touched = resolver
            .apply_to_all_topics(&backend, -100, RuleType::Autoread, true)
            .await
            .unwrap();
        assert_eq!(touched, 3);
        assert_eq!(store.rule_count(), 3);

        resolver
            .apply_to_all_topics(&backend, -100, RuleType::Autoread, false)
            .await
            .unwrap();
        assert_eq!(store.rule_count(), 0);
    }
}
