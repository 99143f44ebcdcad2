// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types owned by the storage crate.
//!
//! Rules, audit entries and settings use the canonical types from
//! `tidyread-core`; the job table types live here because only the queue
//! crate consumes them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use tidyread_core::types::{ActionLog, GlobalUserSettings, Rule};

/// Lifecycle state of a row in the `jobs` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Dead,
}

/// A stored job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub dedup_id: String,
    pub function_name: String,
    /// JSON array of positional arguments.
    pub args: String,
    pub status: JobStatus,
    /// Failed attempts so far. Transient deferrals do not count.
    pub attempts: u32,
    pub max_tries: u32,
    pub run_at: f64,
    pub locked_until: Option<f64>,
    /// Set when new args arrived while the job was running.
    pub rerun: bool,
    pub last_error: Option<String>,
    pub enqueued_at: f64,
    pub finished_at: Option<f64>,
}

/// A job ready to be written to the `jobs` table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub dedup_id: String,
    pub function_name: String,
    pub args: String,
    pub max_tries: u32,
    pub run_at: f64,
}

/// How a submission treats an existing row with the same dedup id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DedupPolicy {
    /// Merge into the pending run with the newest args. A running job is
    /// flagged to run once more afterwards.
    Coalesce,
    /// Drop the submission while a run is pending, running, or finished
    /// less than `keep_result_secs` ago.
    Unique { keep_result_secs: f64 },
}

/// A permanently failed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: i64,
    pub job_id: String,
    pub function_name: String,
    pub args: String,
    pub error: String,
    /// UNIX seconds.
    pub timestamp: f64,
}
