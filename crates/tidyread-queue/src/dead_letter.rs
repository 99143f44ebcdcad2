// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read side of the dead-letter log.
//!
//! Records are written by the worker when it buries a job, in the same
//! transaction that marks the job dead.

use tracing::info;

use tidyread_core::TidyreadError;
use tidyread_storage::queries::dead_letters;
use tidyread_storage::{Database, DeadLetter};

#[derive(Clone)]
pub struct DeadLetterLog {
    db: Database,
    retention_secs: f64,
}

impl DeadLetterLog {
    pub fn new(db: Database, retention_secs: f64) -> Self {
        Self { db, retention_secs }
    }

    pub fn retention_secs(&self) -> f64 {
        self.retention_secs
    }

    /// Newest records first.
    pub async fn list(&self, limit: usize) -> Result<Vec<DeadLetter>, TidyreadError> {
        dead_letters::list(&self.db, limit).await
    }

    /// Remove every record. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, TidyreadError> {
        let removed = dead_letters::clear(&self.db).await?;
        info!(removed, "dead-letter log cleared");
        Ok(removed)
    }

    /// Drop records older than the retention window.
    pub async fn prune(&self, now: f64) -> Result<usize, TidyreadError> {
        dead_letters::prune(&self.db, now - self.retention_secs).await
    }
}
