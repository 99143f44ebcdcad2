// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TidyreadConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &TidyreadConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.app.log_level.trim().to_lowercase().as_str()) {
        fail(format!(
            "app.log_level `{}` must be one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let q = &config.queue;
    if q.workers == 0 {
        fail("queue.workers must be at least 1".to_string());
    }
    if q.max_tries == 0 {
        fail("queue.max_tries must be at least 1".to_string());
    }
    if q.poll_interval_ms == 0 {
        fail("queue.poll_interval_ms must be greater than 0".to_string());
    }

    let non_negative = [
        ("queue.read_debounce_secs", q.read_debounce_secs),
        ("queue.retry_base_secs", q.retry_base_secs),
        ("queue.not_connected_delay_secs", q.not_connected_delay_secs),
        ("queue.flood_buffer_secs", q.flood_buffer_secs),
        ("queue.keep_result_secs", q.keep_result_secs),
        ("queue.dead_letter_retention_secs", q.dead_letter_retention_secs),
        ("queue.shutdown_grace_secs", q.shutdown_grace_secs),
    ];
    for (key, value) in non_negative {
        if !value.is_finite() || value < 0.0 {
            fail(format!("{key} must be a non-negative number, got {value}"));
        }
    }

    if !q.lock_timeout_secs.is_finite() || q.lock_timeout_secs <= 0.0 {
        fail(format!(
            "queue.lock_timeout_secs must be positive, got {}",
            q.lock_timeout_secs
        ));
    }

    if config.rules.album_cache_capacity == 0 {
        fail("rules.album_cache_capacity must be at least 1".to_string());
    }
    if config.rules.default_reaction_emoji.trim().is_empty() {
        fail("rules.default_reaction_emoji must not be empty".to_string());
    }

    if config.gateway.enabled {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
        if config.gateway.port == 0 {
            fail("gateway.port must not be 0".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
