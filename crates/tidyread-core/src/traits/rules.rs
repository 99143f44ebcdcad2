// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule persistence port.

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::{ChatId, NewRule, Rule, RuleConfig, RuleType, TopicId};

/// Durable storage for automation rules.
///
/// Uniqueness of `(chat_id, topic_id, rule_type)` is enforced by the
/// implementation; `topic_id = None` is a distinct scope, not a wildcard.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// The rule stored for exactly this scope, if any.
    async fn find_for_scope(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        rule_type: RuleType,
    ) -> Result<Option<Rule>, TidyreadError>;

    async fn list_all(&self) -> Result<Vec<Rule>, TidyreadError>;

    /// Insert a rule. Inserting over an existing scope returns the existing row.
    async fn insert(&self, rule: NewRule) -> Result<Rule, TidyreadError>;

    async fn update_config(&self, id: i64, config: RuleConfig) -> Result<Rule, TidyreadError>;

    /// Delete a rule by id. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, TidyreadError>;
}
