// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared flood lock.
//!
//! One row holds the UNIX time until which no backend call may be made. It
//! expires `buffer` seconds after that time. Check and set are separate
//! statements: two workers hitting a rate limit at once simply overwrite each
//! other, and a worker that checked just before the lock was set may still
//! issue one call.

use std::time::Duration;

use tracing::warn;

use tidyread_core::TidyreadError;
use tidyread_storage::Database;
use tidyread_storage::queries::flood;

#[derive(Clone)]
pub struct FloodGate {
    db: Database,
    buffer_secs: f64,
}

impl FloodGate {
    pub fn new(db: Database, buffer_secs: f64) -> Self {
        Self { db, buffer_secs }
    }

    pub fn buffer_secs(&self) -> f64 {
        self.buffer_secs
    }

    /// Seconds to wait before calling the backend, `None` when unlocked.
    pub async fn remaining(&self, now: f64) -> Result<Option<f64>, TidyreadError> {
        let wait_until = flood::wait_until(&self.db, now).await?;
        Ok(wait_until.map(|t| t - now).filter(|left| *left > 0.0))
    }

    /// Lock every worker out for `wait`. Returns the new `wait_until`.
    pub async fn engage(&self, wait: Duration, now: f64) -> Result<f64, TidyreadError> {
        let wait_until = now + wait.as_secs_f64();
        flood::set(&self.db, wait_until, wait_until + self.buffer_secs).await?;
        warn!(wait_secs = wait.as_secs_f64(), wait_until, "flood lock engaged");
        crate::metrics::record_flood_wait();
        Ok(wait_until)
    }
}
