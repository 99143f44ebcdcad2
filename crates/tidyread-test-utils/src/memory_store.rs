// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory rule, audit and settings store.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use tidyread_core::types::{
    ActionLog, ChatId, GlobalUserSettings, NewRule, Rule, RuleConfig, RuleType, TopicId,
};
use tidyread_core::{AuditSink, RuleRepository, SettingsProvider, TidyreadError};

#[derive(Default)]
struct State {
    next_id: i64,
    rules: Vec<Rule>,
    logs: Vec<ActionLog>,
    settings: GlobalUserSettings,
    fail_settings: bool,
}

/// Implements [`RuleRepository`], [`AuditSink`] and [`SettingsProvider`]
/// over plain vectors, mirroring the SQLite semantics.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_settings(&self, settings: GlobalUserSettings) {
        self.state().settings = settings;
    }

    /// Make `get_user_settings` fail until reset.
    pub fn fail_settings(&self, fail: bool) {
        self.state().fail_settings = fail;
    }

    pub fn rule_count(&self) -> usize {
        self.state().rules.len()
    }

    /// Audit entries in insertion order.
    pub fn logs(&self) -> Vec<ActionLog> {
        self.state().logs.clone()
    }
}

#[async_trait]
impl RuleRepository for MemoryStore {
    async fn find_for_scope(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        rule_type: RuleType,
    ) -> Result<Option<Rule>, TidyreadError> {
        Ok(self
            .state()
            .rules
            .iter()
            .find(|r| r.chat_id == chat_id && r.topic_id == topic_id && r.rule_type == rule_type)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Rule>, TidyreadError> {
        Ok(self.state().rules.clone())
    }

    async fn insert(&self, rule: NewRule) -> Result<Rule, TidyreadError> {
        let mut state = self.state();
        if let Some(existing) = state.rules.iter().find(|r| {
            r.chat_id == rule.chat_id
                && r.topic_id == rule.topic_id
                && r.rule_type == rule.rule_type
        }) {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let now = chrono::Utc::now().to_rfc3339();
        let stored = Rule {
            id: state.next_id,
            owner_id: rule.owner_id,
            rule_type: rule.rule_type,
            chat_id: rule.chat_id,
            topic_id: rule.topic_id,
            config: rule.config,
            created_at: now.clone(),
            updated_at: now,
        };
        state.rules.push(stored.clone());
        Ok(stored)
    }

    async fn update_config(&self, id: i64, config: RuleConfig) -> Result<Rule, TidyreadError> {
        let mut state = self.state();
        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| TidyreadError::NotFound {
                what: format!("rule {id}"),
            })?;
        rule.config = config;
        rule.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(rule.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, TidyreadError> {
        let mut state = self.state();
        let before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        Ok(state.rules.len() != before)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn add_log(&self, entry: ActionLog) -> Result<(), TidyreadError> {
        self.state().logs.push(entry);
        Ok(())
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<ActionLog>, TidyreadError> {
        Ok(self.state().logs.iter().rev().take(limit).cloned().collect())
    }
}

#[async_trait]
impl SettingsProvider for MemoryStore {
    async fn get_user_settings(&self) -> Result<GlobalUserSettings, TidyreadError> {
        let state = self.state();
        if state.fail_settings {
            return Err(TidyreadError::Internal("settings unavailable".into()));
        }
        Ok(state.settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_rule(chat_id: ChatId) -> NewRule {
        NewRule {
            owner_id: 1,
            rule_type: RuleType::Autoread,
            chat_id,
            topic_id: None,
            config: RuleConfig::new(),
        }
    }

    #[tokio::test]
    async fn insert_is_idempotent_per_scope() {
        let store = MemoryStore::new();
        let a = store.insert(new_rule(5)).await.unwrap();
        let b = store.insert(new_rule(5)).await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.rule_count(), 1);
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
    }

    #[tokio::test]
    async fn recent_logs_are_newest_first() {
        let store = MemoryStore::new();
        for reason in ["a", "b", "c"] {
            store
                .add_log(ActionLog::now("autoread", 1, "c", reason, "/chat/1"))
                .await
                .unwrap();
        }
        let recent = store.recent_logs(2).await.unwrap();
        assert_eq!(recent[0].reason, "c");
        assert_eq!(recent[1].reason, "b");
    }
}
