// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dry run of the rule service for a single stored message.

use std::sync::Arc;

use serde::Serialize;

use tidyread_core::types::{AutoReactConfig, ChatId, MessageQuery, MsgId, RuleType, TopicId};
use tidyread_core::{ChatBackend, TidyreadError};

use crate::checker::GlobalChecker;
use crate::resolver::RuleResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    WouldRead,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactStatus {
    WouldReact,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadOutcome {
    pub status: ReadStatus,
    /// `rule_enabled`, a heuristic reason, or `disabled`.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactOutcome {
    pub status: ReactStatus,
    pub detail: String,
}

/// What the rule service would do with a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Simulation {
    pub autoread: ReadOutcome,
    pub autoreact: ReactOutcome,
}

/// Evaluates rules without submitting jobs, writing audit entries or
/// touching the album cache.
pub struct RuleSimulator {
    resolver: Arc<RuleResolver>,
    checker: Arc<GlobalChecker>,
    backend: Arc<dyn ChatBackend>,
    default_emoji: String,
}

impl RuleSimulator {
    pub fn new(
        resolver: Arc<RuleResolver>,
        checker: Arc<GlobalChecker>,
        backend: Arc<dyn ChatBackend>,
        default_emoji: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            checker,
            backend,
            default_emoji: default_emoji.into(),
        }
    }

    pub async fn simulate(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        msg_id: MsgId,
    ) -> Result<Simulation, TidyreadError> {
        let messages = self
            .backend
            .get_messages(MessageQuery::by_ids(chat_id, vec![msg_id]))
            .await?;
        let message = messages
            .into_iter()
            .find(|m| m.id == msg_id)
            .ok_or_else(|| TidyreadError::NotFound {
                what: format!("message {msg_id} in chat {chat_id}"),
            })?;

        let read_rule = self
            .resolver
            .get_rule(chat_id, topic_id, RuleType::Autoread)
            .await?;
        let autoread = match read_rule {
            Some(_) => ReadOutcome {
                status: ReadStatus::WouldRead,
                reason: "rule_enabled".to_string(),
            },
            None => match self.checker.check(&message, 1).await {
                Some(reason) => ReadOutcome {
                    status: ReadStatus::WouldRead,
                    reason,
                },
                None => ReadOutcome {
                    status: ReadStatus::Skipped,
                    reason: "disabled".to_string(),
                },
            },
        };

        let react_rule = self
            .resolver
            .get_rule(chat_id, topic_id, RuleType::Autoreact)
            .await?;
        let skipped = |detail: &str| ReactOutcome {
            status: ReactStatus::Skipped,
            detail: detail.to_string(),
        };
        let autoreact = match react_rule {
            None => skipped("no_rule"),
            Some(_) if message.is_outgoing => skipped("outgoing"),
            Some(rule) => {
                let config = AutoReactConfig::from_config(&rule.config, &self.default_emoji);
                if !config.targets(message.sender_id) {
                    skipped("sender_mismatch")
                } else if message.has_own_reaction(&config.emoji) {
                    skipped("already_reacted")
                } else {
                    ReactOutcome {
                        status: ReactStatus::WouldReact,
                        detail: format!("emoji: {}", config.emoji),
                    }
                }
            }
        };

        Ok(Simulation {
            autoread,
            autoreact,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyread_core::types::{GlobalUserSettings, Message, Reaction};
    use tidyread_test_utils::{MemoryStore, MockBackend};

    struct Fixture {
        simulator: RuleSimulator,
        store: Arc<MemoryStore>,
        backend: Arc<MockBackend>,
        resolver: Arc<RuleResolver>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MockBackend::new());
        let resolver = Arc::new(RuleResolver::new(store.clone(), 1));
        let checker = Arc::new(GlobalChecker::new(store.clone()));
        let simulator = RuleSimulator::new(resolver.clone(), checker, backend.clone(), "💩");
        Fixture {
            simulator,
            store,
            backend,
            resolver,
        }
    }

    fn from(sender: i64, id: MsgId) -> Message {
        Message {
            id,
            sender_id: Some(sender),
            text: "hello".into(),
            ..Default::default()
        }
    }

    async fn react_rule(f: &Fixture, config: serde_json::Value) {
        f.resolver
            .toggle_rule(1, None, RuleType::Autoreact, true, config.as_object().cloned())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_message_is_not_found() {
        let f = fixture();
        let err = f.simulator.simulate(1, None, 5).await.unwrap_err();
        assert!(matches!(err, TidyreadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn nothing_configured_skips_both() {
        let f = fixture();
        f.backend.add_message(1, None, from(42, 5));
        let sim = f.simulator.simulate(1, None, 5).await.unwrap();
        assert_eq!(sim.autoread.status, ReadStatus::Skipped);
        assert_eq!(sim.autoread.reason, "disabled");
        assert_eq!(sim.autoreact.detail, "no_rule");
    }

    #[tokio::test]
    async fn rules_and_heuristics_are_reported() {
        let f = fixture();
        f.store.set_settings(GlobalUserSettings {
            autoread_regex: "hel+o".into(),
            ..Default::default()
        });
        f.backend.add_message(1, None, from(42, 5));
        react_rule(&f, serde_json::json!({"emoji": "👍", "target_users": [42]})).await;

        let sim = f.simulator.simulate(1, None, 5).await.unwrap();
        assert_eq!(sim.autoread.reason, "global_regex");
        assert_eq!(sim.autoreact.status, ReactStatus::WouldReact);
        assert_eq!(sim.autoreact.detail, "emoji: 👍");

        f.resolver
            .toggle_rule(1, None, RuleType::Autoread, true, None)
            .await
            .unwrap();
        let sim = f.simulator.simulate(1, None, 5).await.unwrap();
        assert_eq!(sim.autoread.reason, "rule_enabled");
    }

    #[tokio::test]
    async fn reaction_skip_details() {
        let f = fixture();
        react_rule(&f, serde_json::json!({"target_users": [7]})).await;
        f.backend.add_message(1, None, from(42, 5));
        let sim = f.simulator.simulate(1, None, 5).await.unwrap();
        assert_eq!(sim.autoreact.detail, "sender_mismatch");

        react_rule(&f, serde_json::json!({})).await;
        f.backend.add_message(
            1,
            None,
            Message {
                reactions: vec![Reaction {
                    emoji: "💩".into(),
                    custom_emoji_id: None,
                    is_chosen_by_self: true,
                }],
                ..from(42, 6)
            },
        );
        let sim = f.simulator.simulate(1, None, 6).await.unwrap();
        assert_eq!(sim.autoreact.detail, "already_reacted");
    }

    #[test]
    fn serializes_snake_case_statuses() {
        let sim = Simulation {
            autoread: ReadOutcome {
                status: ReadStatus::WouldRead,
                reason: "rule_enabled".into(),
            },
            autoreact: ReactOutcome {
                status: ReactStatus::Skipped,
                detail: "no_rule".into(),
            },
        };
        let json = serde_json::to_value(&sim).unwrap();
        assert_eq!(json["autoread"]["status"], "would_read");
        assert_eq!(json["autoreact"]["status"], "skipped");
    }
}
