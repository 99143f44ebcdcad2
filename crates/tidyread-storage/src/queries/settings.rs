// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single row of user-wide autoread settings.

use rusqlite::params;
use tidyread_core::TidyreadError;
use tidyread_core::types::GlobalUserSettings;

use crate::database::{Database, map_tr_err};

pub async fn get_user_settings(db: &Database) -> Result<GlobalUserSettings, TidyreadError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT autoread_service_messages, autoread_polls, autoread_self,
                        autoread_bots, autoread_regex
                 FROM user_settings WHERE id = 1",
                [],
                |row| {
                    Ok(GlobalUserSettings {
                        autoread_service_messages: row.get(0)?,
                        autoread_polls: row.get(1)?,
                        autoread_self: row.get(2)?,
                        autoread_bots: row.get(3)?,
                        autoread_regex: row.get(4)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_user_settings(
    db: &Database,
    settings: GlobalUserSettings,
) -> Result<(), TidyreadError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_settings (id, autoread_service_messages, autoread_polls,
                    autoread_self, autoread_bots, autoread_regex)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    autoread_service_messages = excluded.autoread_service_messages,
                    autoread_polls = excluded.autoread_polls,
                    autoread_self = excluded.autoread_self,
                    autoread_bots = excluded.autoread_bots,
                    autoread_regex = excluded.autoread_regex",
                params![
                    settings.autoread_service_messages,
                    settings.autoread_polls,
                    settings.autoread_self,
                    settings.autoread_bots,
                    settings.autoread_regex
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    #[tokio::test]
    async fn defaults_are_all_off() {
        let (db, _dir) = setup_db().await;
        let settings = get_user_settings(&db).await.unwrap();
        assert_eq!(settings, GlobalUserSettings::default());
    }

    #[tokio::test]
    async fn update_replaces_row() {
        let (db, _dir) = setup_db().await;
        let wanted = GlobalUserSettings {
            autoread_polls: true,
            autoread_bots: "@SpamBot, @AdBot".to_string(),
            autoread_regex: "^promo".to_string(),
            ..Default::default()
        };
        update_user_settings(&db, wanted.clone()).await.unwrap();
        assert_eq!(get_user_settings(&db).await.unwrap(), wanted);
    }
}
