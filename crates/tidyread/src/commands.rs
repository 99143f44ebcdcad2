// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline maintenance commands that operate on the database directly.

use std::sync::Arc;

use tidyread_config::TidyreadConfig;
use tidyread_core::{RuleConfig, RuleType, TidyreadError};
use tidyread_queue::DeadLetterLog;
use tidyread_rules::RuleResolver;
use tidyread_storage::SqliteStorage;

async fn open_storage(config: &TidyreadConfig) -> Result<Arc<SqliteStorage>, TidyreadError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), TidyreadError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn check_config(config: &TidyreadConfig) {
    println!("configuration OK");
    println!("  database:  {}", config.storage.database_path);
    println!("  workers:   {}", config.queue.workers);
    println!("  max tries: {}", config.queue.max_tries);
    println!("  scanner:   {}", if config.scanner.enabled { "on" } else { "off" });
    println!("  metrics:   {}", if config.metrics.enabled { "on" } else { "off" });
    if config.gateway.enabled {
        println!("  gateway:   {}:{}", config.gateway.host, config.gateway.port);
    } else {
        println!("  gateway:   off");
    }
}

pub async fn list_rules(config: &TidyreadConfig) -> Result<(), TidyreadError> {
    let storage = open_storage(config).await?;
    let resolver = RuleResolver::new(storage, config.app.owner_id);
    print_json(&resolver.list_rules().await?)
}

pub async fn set_rule(
    config: &TidyreadConfig,
    chat_id: i64,
    topic_id: Option<i64>,
    rule_type: RuleType,
    enabled: bool,
    emoji: Option<String>,
) -> Result<(), TidyreadError> {
    let storage = open_storage(config).await?;
    let resolver = RuleResolver::new(storage, config.app.owner_id);

    let rule_config = emoji.map(|emoji| {
        let mut map = RuleConfig::new();
        map.insert("emoji".to_string(), serde_json::Value::String(emoji));
        map
    });
    match resolver
        .toggle_rule(chat_id, topic_id, rule_type, enabled, rule_config)
        .await?
    {
        Some(rule) => print_json(&rule),
        None => {
            println!("{rule_type} disabled for chat {chat_id}");
            Ok(())
        }
    }
}

fn dead_letter_log(storage: &SqliteStorage, config: &TidyreadConfig) -> Result<DeadLetterLog, TidyreadError> {
    Ok(DeadLetterLog::new(
        storage.database()?.clone(),
        config.queue.dead_letter_retention_secs,
    ))
}

pub async fn list_dead_letters(config: &TidyreadConfig, limit: usize) -> Result<(), TidyreadError> {
    let storage = open_storage(config).await?;
    let log = dead_letter_log(&storage, config)?;
    print_json(&log.list(limit).await?)
}

pub async fn clear_dead_letters(config: &TidyreadConfig) -> Result<(), TidyreadError> {
    let storage = open_storage(config).await?;
    let removed = dead_letter_log(&storage, config)?.clear().await?;
    println!("cleared {removed} dead letter(s)");
    Ok(())
}
