// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule rows. One row per `(chat_id, topic_id, rule_type)` scope.

use std::str::FromStr;

use rusqlite::{OptionalExtension, Row, params};
use tidyread_core::types::{ChatId, NewRule, Rule, RuleConfig, RuleType, TopicId};
use tidyread_core::TidyreadError;

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, owner_id, rule_type, chat_id, topic_id, config, created_at, updated_at";

fn row_to_rule(row: &Row<'_>) -> Result<Rule, rusqlite::Error> {
    let rule_type: String = row.get(2)?;
    let config: String = row.get(5)?;
    Ok(Rule {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        rule_type: RuleType::from_str(&rule_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        chat_id: row.get(3)?,
        topic_id: row.get(4)?,
        config: serde_json::from_str(&config).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn select_scope(
    conn: &rusqlite::Connection,
    chat_id: ChatId,
    topic_id: Option<TopicId>,
    rule_type: &str,
) -> Result<Option<Rule>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM rules
             WHERE chat_id = ?1 AND topic_id IS ?2 AND rule_type = ?3"
        ),
        params![chat_id, topic_id, rule_type],
        row_to_rule,
    )
    .optional()
}

/// The rule for exactly this scope. `topic_id = None` matches chat-wide rows only.
pub async fn find_for_scope(
    db: &Database,
    chat_id: ChatId,
    topic_id: Option<TopicId>,
    rule_type: RuleType,
) -> Result<Option<Rule>, TidyreadError> {
    let rule_type = rule_type.to_string();
    db.connection()
        .call(move |conn| select_scope(conn, chat_id, topic_id, &rule_type))
        .await
        .map_err(map_tr_err)
}

/// All rules ordered by chat, then topic (chat-wide first).
pub async fn list_all(db: &Database) -> Result<Vec<Rule>, TidyreadError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM rules ORDER BY chat_id, topic_id, rule_type"
            ))?;
            let rules = stmt
                .query_map([], row_to_rule)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rules)
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a rule, or return the row already holding its scope.
pub async fn insert(db: &Database, rule: NewRule) -> Result<Rule, TidyreadError> {
    let config = serde_json::to_string(&rule.config)?;
    let rule_type = rule.rule_type.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO rules (owner_id, rule_type, chat_id, topic_id, config)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![rule.owner_id, rule_type, rule.chat_id, rule.topic_id, config],
            )?;
            select_scope(conn, rule.chat_id, rule.topic_id, &rule_type)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a rule's config and touch `updated_at`.
pub async fn update_config(
    db: &Database,
    id: i64,
    config: RuleConfig,
) -> Result<Rule, TidyreadError> {
    let config = serde_json::to_string(&config)?;
    let updated = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE rules SET config = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![config, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM rules WHERE id = ?1"),
                params![id],
                row_to_rule,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    updated.ok_or_else(|| TidyreadError::NotFound {
        what: format!("rule {id}"),
    })
}

/// Delete a rule. Returns whether a row was removed.
pub async fn delete(db: &Database, id: i64) -> Result<bool, TidyreadError> {
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM rules WHERE id = ?1", params![id])?;
            Ok(n > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of rows for one scope. Used to check the one-row-per-scope invariant.
pub async fn count_for_scope(
    db: &Database,
    chat_id: ChatId,
    topic_id: Option<TopicId>,
    rule_type: RuleType,
) -> Result<i64, TidyreadError> {
    let rule_type = rule_type.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM rules
                 WHERE chat_id = ?1 AND topic_id IS ?2 AND rule_type = ?3",
                params![chat_id, topic_id, rule_type],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    fn new_rule(chat_id: i64, topic_id: Option<i64>, rule_type: RuleType) -> NewRule {
        NewRule {
            owner_id: 1,
            rule_type,
            chat_id,
            topic_id,
            config: RuleConfig::new(),
        }
    }

    #[tokio::test]
    async fn insert_and_find_by_scope() {
        let (db, _dir) = setup_db().await;
        let rule = insert(&db, new_rule(100, None, RuleType::Autoread)).await.unwrap();
        assert!(rule.id > 0);
        assert_eq!(rule.rule_type, RuleType::Autoread);
        assert!(rule.config.is_empty());

        let found = find_for_scope(&db, 100, None, RuleType::Autoread).await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(rule.id));

        // Chat-wide row does not answer a topic lookup at this layer.
        assert!(find_for_scope(&db, 100, Some(3), RuleType::Autoread).await.unwrap().is_none());
        assert!(find_for_scope(&db, 100, None, RuleType::Autoreact).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_scope_returns_existing_row() {
        let (db, _dir) = setup_db().await;
        let first = insert(&db, new_rule(5, Some(9), RuleType::Autoreact)).await.unwrap();
        let second = insert(&db, new_rule(5, Some(9), RuleType::Autoreact)).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(count_for_scope(&db, 5, Some(9), RuleType::Autoreact).await.unwrap(), 1);

        insert(&db, new_rule(5, None, RuleType::Autoreact)).await.unwrap();
        insert(&db, new_rule(5, None, RuleType::Autoreact)).await.unwrap();
        assert_eq!(count_for_scope(&db, 5, None, RuleType::Autoreact).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_config_round_trips_json() {
        let (db, _dir) = setup_db().await;
        let rule = insert(&db, new_rule(1, None, RuleType::Autoreact)).await.unwrap();
        let config = serde_json::json!({"emoji": "👍", "target_users": [1, 2]})
            .as_object()
            .unwrap()
            .clone();
        let updated = update_config(&db, rule.id, config.clone()).await.unwrap();
        assert_eq!(updated.config, config);

        let err = update_config(&db, 9999, RuleConfig::new()).await.unwrap_err();
        assert!(matches!(err, TidyreadError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (db, _dir) = setup_db().await;
        let rule = insert(&db, new_rule(1, Some(2), RuleType::Autoread)).await.unwrap();
        assert!(delete(&db, rule.id).await.unwrap());
        assert!(!delete(&db, rule.id).await.unwrap());
        assert_eq!(count_for_scope(&db, 1, Some(2), RuleType::Autoread).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_orders_chat_wide_first() {
        let (db, _dir) = setup_db().await;
        insert(&db, new_rule(2, Some(1), RuleType::Autoread)).await.unwrap();
        insert(&db, new_rule(1, None, RuleType::Autoread)).await.unwrap();
        insert(&db, new_rule(2, None, RuleType::Autoread)).await.unwrap();
        let scopes: Vec<_> = list_all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.chat_id, r.topic_id))
            .collect();
        assert_eq!(scopes, vec![(1, None), (2, None), (2, Some(1))]);
    }
}
