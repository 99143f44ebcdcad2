// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level tidyread configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidyreadConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Durable job queue and worker settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Rule engine settings.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Startup backlog scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// JSON HTTP API settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Owner recorded on rules created by this instance.
    #[serde(default)]
    pub owner_id: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            owner_id: 0,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tidyread").join("tidyread.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tidyread.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// Job queue configuration.
///
/// Durations are stored as plain numbers so they can be set from env vars;
/// use the accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Number of concurrent worker tasks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Attempts before a job is dead-lettered.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// How often idle workers poll for due jobs.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Debounce applied to mark-read jobs.
    #[serde(default = "default_read_debounce_secs")]
    pub read_debounce_secs: f64,

    /// First retry delay; doubles for each further attempt.
    #[serde(default = "default_retry_base_secs")]
    pub retry_base_secs: f64,

    /// Fixed reschedule delay while the backend is disconnected.
    #[serde(default = "default_not_connected_delay_secs")]
    pub not_connected_delay_secs: f64,

    /// Extra wait added on top of a backend flood wait.
    #[serde(default = "default_flood_buffer_secs")]
    pub flood_buffer_secs: f64,

    /// How long finished jobs are kept for duplicate suppression.
    #[serde(default = "default_keep_result_secs")]
    pub keep_result_secs: f64,

    #[serde(default = "default_dead_letter_retention_secs")]
    pub dead_letter_retention_secs: f64,

    /// Lock held on a claimed job; an expired lock makes it claimable again.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: f64,

    /// Time workers get to finish in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_tries: default_max_tries(),
            poll_interval_ms: default_poll_interval_ms(),
            read_debounce_secs: default_read_debounce_secs(),
            retry_base_secs: default_retry_base_secs(),
            not_connected_delay_secs: default_not_connected_delay_secs(),
            flood_buffer_secs: default_flood_buffer_secs(),
            keep_result_secs: default_keep_result_secs(),
            dead_letter_retention_secs: default_dead_letter_retention_secs(),
            lock_timeout_secs: default_lock_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs_f64(self.shutdown_grace_secs.max(0.0))
    }
}

fn default_workers() -> usize {
    4
}

fn default_max_tries() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_read_debounce_secs() -> f64 {
    0.5
}

fn default_retry_base_secs() -> f64 {
    5.0
}

fn default_not_connected_delay_secs() -> f64 {
    10.0
}

fn default_flood_buffer_secs() -> f64 {
    1.0
}

fn default_keep_result_secs() -> f64 {
    3600.0
}

fn default_dead_letter_retention_secs() -> f64 {
    3.0 * 24.0 * 3600.0
}

fn default_lock_timeout_secs() -> f64 {
    300.0
}

fn default_shutdown_grace_secs() -> f64 {
    10.0
}

/// Rule engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Window during which further messages of one album are not reacted to.
    #[serde(default = "default_album_window_secs")]
    pub album_window_secs: u64,

    /// Maximum albums tracked at once.
    #[serde(default = "default_album_cache_capacity")]
    pub album_cache_capacity: usize,

    /// Re-check the live unread count before a heuristic read.
    #[serde(default = "default_true")]
    pub verify_unread_count: bool,

    /// Emoji used when an AUTOREACT rule does not name one.
    #[serde(default = "default_reaction_emoji")]
    pub default_reaction_emoji: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            album_window_secs: default_album_window_secs(),
            album_cache_capacity: default_album_cache_capacity(),
            verify_unread_count: true,
            default_reaction_emoji: default_reaction_emoji(),
        }
    }
}

impl RulesConfig {
    pub fn album_window(&self) -> Duration {
        Duration::from_secs(self.album_window_secs)
    }
}

fn default_album_window_secs() -> u64 {
    60
}

fn default_album_cache_capacity() -> usize {
    1000
}

fn default_reaction_emoji() -> String {
    "💩".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Run the backlog scan once at startup.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pause after each chat.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pause_ms: default_pause_ms(),
        }
    }
}

impl ScannerConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

fn default_pause_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics` on the gateway.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8088
}
