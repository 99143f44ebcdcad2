// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for tidyread.
//!
//! - [`MockBackend`]: scripted chat backend recording every side effect
//! - [`MemoryStore`]: in-memory rules, audit log and settings
//! - [`RecordingJobs`]: job submitter that only records submissions
//! - [`TestHarness`]: temp SQLite database plus a mock backend and config

pub mod harness;
pub mod memory_store;
pub mod mock_backend;
pub mod recording_jobs;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
pub use mock_backend::{BackendOp, MockBackend, MockFailure, ReactionCall, ReadCall};
pub use recording_jobs::{RecordingJobs, SubmittedJob};
