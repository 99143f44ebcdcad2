// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit trail port.

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::ActionLog;

/// Append-only record of automated actions.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn add_log(&self, entry: ActionLog) -> Result<(), TidyreadError>;

    /// Most recent entries, newest first.
    async fn recent_logs(&self, limit: usize) -> Result<Vec<ActionLog>, TidyreadError>;
}
