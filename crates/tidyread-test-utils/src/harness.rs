// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` provides a migrated temp SQLite database, a
//! [`MockBackend`] and a config tuned for fast queue turnaround. Crates
//! higher up the stack wire their services on top of it.

use std::sync::Arc;

use tidyread_config::model::{StorageConfig, TidyreadConfig};
use tidyread_core::TidyreadError;
use tidyread_core::types::GlobalUserSettings;
use tidyread_storage::SqliteStorage;

use crate::mock_backend::MockBackend;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TidyreadConfig,
    settings: Option<GlobalUserSettings>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TidyreadConfig::default();
        config.app.owner_id = 1;
        config.queue.workers = 2;
        config.queue.poll_interval_ms = 10;
        config.queue.read_debounce_secs = 0.05;
        config.queue.retry_base_secs = 0.05;
        config.queue.not_connected_delay_secs = 0.1;
        config.queue.flood_buffer_secs = 0.05;
        config.queue.shutdown_grace_secs = 2.0;
        config.scanner.pause_ms = 0;
        config.metrics.enabled = false;
        Self {
            config,
            settings: None,
        }
    }

    /// Adjust the config before the harness is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut TidyreadConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Seed the global heuristics row.
    pub fn with_settings(mut self, settings: GlobalUserSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub async fn build(self) -> Result<TestHarness, TidyreadError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| TidyreadError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.clone(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        if let Some(settings) = self.settings {
            storage.update_user_settings(settings).await?;
        }

        Ok(TestHarness {
            storage: Arc::new(storage),
            backend: Arc::new(MockBackend::new()),
            config,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A temp database, a mock backend and a matching config.
pub struct TestHarness {
    /// Initialized SQLite storage (temp DB, removed on drop).
    pub storage: Arc<SqliteStorage>,
    pub backend: Arc<MockBackend>,
    /// Config whose `storage.database_path` points at the temp DB.
    pub config: TidyreadConfig,
    pub db_path: String,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }
}
