// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule engine for tidyread.
//!
//! - [`resolver`]: topic-over-chat rule lookup and presence-based toggling
//! - [`checker`]: user-wide autoread heuristics for a single newest message
//! - [`service`]: the event handler turning messages into read/react jobs
//! - [`scanner`]: one-shot backlog reconciliation at startup
//! - [`simulator`]: dry-run of the service for one message

pub mod cache;
pub mod checker;
pub mod resolver;
pub mod scanner;
pub mod service;
pub mod simulator;

pub use cache::AlbumCache;
pub use checker::GlobalChecker;
pub use resolver::RuleResolver;
pub use scanner::{ScanReport, StartupScanner};
pub use service::{Decision, RuleService};
pub use simulator::{ReactOutcome, ReactStatus, ReadOutcome, ReadStatus, RuleSimulator, Simulation};

/// Audit reason for reads caused by an explicit rule.
pub const REASON_AUTOREAD_RULE: &str = "autoread_rule";
/// Audit reason for reads queued by the startup scan from an explicit rule.
pub const REASON_AUTOREAD_RULE_STARTUP: &str = "autoread_rule_startup";
/// Audit reason for reactions.
pub const REASON_AUTOREACT_RULE: &str = "autoreact_rule";
