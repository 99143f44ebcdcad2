// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job execution for tidyread.
//!
//! Jobs are rows in the SQLite `jobs` table keyed by a deterministic dedup
//! id. A pool of workers claims due rows, consults the shared flood lock,
//! runs the backend call and classifies the outcome: rate limits defer every
//! worker, a missing connection retries on a fixed delay, rejections are
//! dropped, and other failures back off until they land in the dead-letter
//! log.

pub mod dead_letter;
pub mod executor;
pub mod flood;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod worker;

pub use dead_letter::DeadLetterLog;
pub use executor::{Execution, JobExecutor};
pub use flood::FloodGate;
pub use job::{FN_MARK_AS_READ, FN_SEND_REACTION, Job, JobCall};
pub use queue::JobQueue;
pub use worker::{JobOutcome, WorkerPool};
