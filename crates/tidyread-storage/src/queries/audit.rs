// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log of automated actions.

use rusqlite::params;
use tidyread_core::TidyreadError;
use tidyread_core::types::ActionLog;

use crate::database::{Database, map_tr_err};

pub async fn add_log(db: &Database, entry: ActionLog) -> Result<(), TidyreadError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO action_logs (action, chat_id, chat_name, reason, timestamp, link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.action,
                    entry.chat_id,
                    entry.chat_name,
                    entry.reason,
                    entry.timestamp,
                    entry.link
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest entries first.
pub async fn recent_logs(db: &Database, limit: usize) -> Result<Vec<ActionLog>, TidyreadError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT action, chat_id, chat_name, reason, timestamp, link
                 FROM action_logs ORDER BY id DESC LIMIT ?1",
            )?;
            let logs = stmt
                .query_map(params![limit], |row| {
                    Ok(ActionLog {
                        action: row.get(0)?,
                        chat_id: row.get(1)?,
                        chat_name: row.get(2)?,
                        reason: row.get(3)?,
                        timestamp: row.get(4)?,
                        link: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn recent_logs_are_newest_first() {
        let (db, _dir) = setup_db().await;
        for reason in ["first", "second", "third"] {
            add_log(&db, ActionLog::now("autoread", 10, "Chat", reason, "/chat/10"))
                .await
                .unwrap();
        }
        let logs = recent_logs(&db, 2).await.unwrap();
        let reasons: Vec<_> = logs.iter().map(|l| l.reason.as_str()).collect();
        assert_eq!(reasons, vec!["third", "second"]);
        assert_eq!(logs[0].action, "autoread");
        assert_eq!(logs[0].link, "/chat/10");
    }
}
