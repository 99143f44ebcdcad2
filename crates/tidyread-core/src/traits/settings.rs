// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User settings port.

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::GlobalUserSettings;

/// Source of the user-wide autoread heuristics.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn get_user_settings(&self) -> Result<GlobalUserSettings, TidyreadError>;
}
