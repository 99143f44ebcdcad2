// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-wide autoread heuristics.
//!
//! Heuristics only ever apply to a single newest message: any caller-provided
//! unread count above 1 short-circuits to "no match" so a backlog is never
//! cleared silently.

use std::sync::{Arc, Mutex};

use regex::{Regex, RegexBuilder};
use tracing::warn;

use tidyread_core::types::{GlobalUserSettings, Message};
use tidyread_core::SettingsProvider;

/// Compiled size cap for the user-supplied `autoread_regex`.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Evaluate the heuristics in priority order; the first match wins.
///
/// `regex` is the compiled `autoread_regex`, `None` when empty or malformed.
pub fn evaluate(
    settings: &GlobalUserSettings,
    message: &Message,
    unread_count: i64,
    regex: Option<&Regex>,
) -> Option<String> {
    if unread_count > 1 {
        return None;
    }

    if settings.autoread_service_messages && message.is_service {
        return Some("global_service_msg".to_string());
    }
    if settings.autoread_polls && message.is_poll {
        return Some("global_poll".to_string());
    }
    if settings.autoread_self && message.is_outgoing {
        return Some("global_self".to_string());
    }

    if let Some(sender) = message
        .sender_username
        .as_deref()
        .map(str::to_lowercase)
        .filter(|s| !s.is_empty())
        && bot_usernames(&settings.autoread_bots).any(|bot| bot == sender)
    {
        return Some(format!("global_bot_{sender}"));
    }

    if let Some(re) = regex
        && !message.text.is_empty()
        && re.is_match(&message.text)
    {
        return Some("global_regex".to_string());
    }

    None
}

/// Normalized entries of a comma-separated bot list.
fn bot_usernames(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(',')
        .map(|b| b.trim().trim_start_matches('@').to_lowercase())
        .filter(|b| !b.is_empty())
}

/// Heuristic checker reading settings from a [`SettingsProvider`].
pub struct GlobalChecker {
    settings: Arc<dyn SettingsProvider>,
    /// Last compiled pattern; `None` value marks a pattern that failed to compile.
    compiled: Mutex<Option<(String, Option<Regex>)>>,
}

impl GlobalChecker {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            settings,
            compiled: Mutex::new(None),
        }
    }

    /// Reason string when a heuristic matches, `None` otherwise.
    ///
    /// A failed settings lookup is logged and treated as no match.
    pub async fn check(&self, message: &Message, unread_count: i64) -> Option<String> {
        if unread_count > 1 {
            return None;
        }
        let settings = match self.settings.get_user_settings().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not load user settings for autoread check");
                return None;
            }
        };
        let regex = self.regex_for(&settings.autoread_regex);
        evaluate(&settings, message, unread_count, regex.as_ref())
    }

    fn regex_for(&self, pattern: &str) -> Option<Regex> {
        if pattern.is_empty() {
            return None;
        }
        let mut cached = self.compiled.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((cached_pattern, regex)) = cached.as_ref()
            && cached_pattern == pattern
        {
            return regex.clone();
        }

        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build() {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(pattern, error = %e, "invalid autoread regex, ignoring");
                None
            }
        };
        *cached = Some((pattern.to_string(), regex.clone()));
        regex
    }
}
