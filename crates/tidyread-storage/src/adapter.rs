// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the rule, audit and settings ports.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tidyread_config::model::StorageConfig;
use tidyread_core::types::{
    ActionLog, ChatId, GlobalUserSettings, NewRule, Rule, RuleConfig, RuleType, TopicId,
};
use tidyread_core::{AuditSink, RuleRepository, SettingsProvider, TidyreadError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage.
///
/// The database is opened by [`SqliteStorage::initialize`]; calls made
/// before that fail with a storage error.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig::default(),
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database and run migrations.
    pub async fn initialize(&self) -> Result<(), TidyreadError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| TidyreadError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// The shared database handle.
    pub fn database(&self) -> Result<&Database, TidyreadError> {
        self.db.get().ok_or_else(|| TidyreadError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    pub async fn update_user_settings(
        &self,
        settings: GlobalUserSettings,
    ) -> Result<(), TidyreadError> {
        queries::settings::update_user_settings(self.database()?, settings).await
    }

    /// Checkpoint the WAL. The connection closes when the last handle drops.
    pub async fn close(&self) -> Result<(), TidyreadError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for SqliteStorage {
    async fn find_for_scope(
        &self,
        chat_id: ChatId,
        topic_id: Option<TopicId>,
        rule_type: RuleType,
    ) -> Result<Option<Rule>, TidyreadError> {
        queries::rules::find_for_scope(self.database()?, chat_id, topic_id, rule_type).await
    }

    async fn list_all(&self) -> Result<Vec<Rule>, TidyreadError> {
        queries::rules::list_all(self.database()?).await
    }

    async fn insert(&self, rule: NewRule) -> Result<Rule, TidyreadError> {
        queries::rules::insert(self.database()?, rule).await
    }

    async fn update_config(&self, id: i64, config: RuleConfig) -> Result<Rule, TidyreadError> {
        queries::rules::update_config(self.database()?, id, config).await
    }

    async fn delete(&self, id: i64) -> Result<bool, TidyreadError> {
        queries::rules::delete(self.database()?, id).await
    }
}

#[async_trait]
impl AuditSink for SqliteStorage {
    async fn add_log(&self, entry: ActionLog) -> Result<(), TidyreadError> {
        queries::audit::add_log(self.database()?, entry).await
    }

    async fn recent_logs(&self, limit: usize) -> Result<Vec<ActionLog>, TidyreadError> {
        queries::audit::recent_logs(self.database()?, limit).await
    }
}

#[async_trait]
impl SettingsProvider for SqliteStorage {
    async fn get_user_settings(&self) -> Result<GlobalUserSettings, TidyreadError> {
        queries::settings::get_user_settings(self.database()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let storage = SqliteStorage::new(StorageConfig::default());
        let err = storage.list_all().await.unwrap_err();
        assert!(matches!(err, TidyreadError::Storage { .. }));
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("s.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(config);
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn ports_share_one_database() {
        let storage = SqliteStorage::from_database(Database::open_in_memory().await.unwrap());
        storage
            .update_user_settings(GlobalUserSettings {
                autoread_self: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(storage.get_user_settings().await.unwrap().autoread_self);

        storage
            .add_log(ActionLog::now("autoread", 1, "c", "autoread_rule", "/chat/1"))
            .await
            .unwrap();
        assert_eq!(storage.recent_logs(10).await.unwrap().len(), 1);
    }
}
