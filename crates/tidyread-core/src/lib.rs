// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for tidyread, the chat autoread/autoreact engine.
//!
//! This crate holds the error type, the domain types and the port traits
//! every other crate in the workspace is written against. Nothing here
//! performs I/O.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TidyreadError;
pub use types::{
    ActionLog, AutoReactConfig, Chat, ChatId, ChatType, DEFAULT_REACTION_EMOJI, EnqueueOutcome,
    EventKind, GlobalUserSettings, Message, MessageQuery, MsgId, NewRule, Reaction, ReadFlag,
    Rule, RuleConfig, RuleType, SystemEvent, Topic, TopicId, UserId, reaction_dedup_id,
    read_dedup_id, unix_now,
};

pub use traits::{
    AuditSink, ChatBackend, EventHandler, JobSubmitter, RuleRepository, SettingsProvider,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rule_type_uses_lowercase_names() {
        assert_eq!(RuleType::Autoread.to_string(), "autoread");
        assert_eq!(RuleType::from_str("autoreact").unwrap(), RuleType::Autoreact);
        assert_eq!(
            serde_json::to_string(&RuleType::Autoreact).unwrap(),
            "\"autoreact\""
        );
        assert!(RuleType::from_str("AUTOREAD").is_err());
    }

    #[test]
    fn transient_errors_are_rate_limit_and_disconnect() {
        assert!(
            TidyreadError::RateLimited {
                wait: std::time::Duration::from_secs(3)
            }
            .is_transient()
        );
        assert!(TidyreadError::NotConnected.is_transient());
        assert!(!TidyreadError::backend("boom").is_transient());
        assert!(!TidyreadError::rejected("topic closed").is_transient());
    }

    #[test]
    fn autoreact_config_defaults_emoji() {
        let cfg = AutoReactConfig::from_config(&RuleConfig::new(), DEFAULT_REACTION_EMOJI);
        assert_eq!(cfg.emoji, "💩");
        assert!(cfg.target_users.is_empty());
        assert!(cfg.targets(None));
        assert!(cfg.targets(Some(7)));
    }

    #[test]
    fn autoreact_config_accepts_numeric_strings() {
        let config = serde_json::json!({
            "emoji": "🔥",
            "target_users": [42, "43", " 44 ", "bob", null]
        });
        let config = config.as_object().unwrap().clone();
        let cfg = AutoReactConfig::from_config(&config, DEFAULT_REACTION_EMOJI);
        assert_eq!(cfg.emoji, "🔥");
        assert_eq!(cfg.target_users, vec![42, 43, 44]);
        assert!(cfg.targets(Some(43)));
        assert!(!cfg.targets(Some(99)));
        assert!(!cfg.targets(None));
    }

    #[test]
    fn own_reaction_matches_plain_and_custom_emoji() {
        let msg = Message {
            id: 1,
            reactions: vec![
                Reaction {
                    emoji: "👍".into(),
                    custom_emoji_id: None,
                    is_chosen_by_self: true,
                },
                Reaction {
                    emoji: String::new(),
                    custom_emoji_id: Some(5368324170671202286),
                    is_chosen_by_self: true,
                },
                Reaction {
                    emoji: "🔥".into(),
                    custom_emoji_id: None,
                    is_chosen_by_self: false,
                },
            ],
            ..Default::default()
        };
        assert!(msg.has_own_reaction("👍"));
        assert!(msg.has_own_reaction("5368324170671202286"));
        assert!(!msg.has_own_reaction("🔥"));
    }

    #[test]
    fn read_flag_is_shared_between_clones() {
        let event = SystemEvent::new_message(10, "chat", Message::default());
        let copy = event.clone();
        assert!(!copy.is_read());
        event.read.mark();
        assert!(copy.is_read());
    }

    #[test]
    fn dedup_ids_are_deterministic() {
        assert_eq!(read_dedup_id(100, None), "read_100_none");
        assert_eq!(read_dedup_id(-100, Some(5)), "read_-100_5");
        assert_eq!(reaction_dedup_id(200, 17, "👍"), "react_200_17_👍");
    }

    #[test]
    fn topic_events_link_to_forum_topic() {
        let event = SystemEvent::new_message(-100, "forum", Message::default()).in_topic(7);
        assert_eq!(event.topic_id, Some(7));
        assert_eq!(event.link, "/forum/-100/topic/7");
    }
}
