// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The shared flood lock row.
//!
//! Reads and writes are independent statements; two workers can both see an
//! open lock before either sets it.

use rusqlite::{OptionalExtension, params};
use tidyread_core::TidyreadError;

use crate::database::{Database, map_tr_err};

/// Key of the single lock row shared by every worker.
pub const FLOOD_LOCK_KEY: &str = "flood_wait_until";

/// `wait_until` of the lock, or `None` when absent or expired at `now`.
pub async fn wait_until(db: &Database, now: f64) -> Result<Option<f64>, TidyreadError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT wait_until FROM flood_lock WHERE key = ?1 AND expires_at > ?2",
                params![FLOOD_LOCK_KEY, now],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the lock.
pub async fn set(db: &Database, wait_until: f64, expires_at: f64) -> Result<(), TidyreadError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO flood_lock (key, wait_until, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![FLOOD_LOCK_KEY, wait_until, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
