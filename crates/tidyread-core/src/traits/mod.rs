// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits separating the automation core from its collaborators.
//!
//! All ports use `#[async_trait]` so they can be held as `Arc<dyn ...>`.

pub mod audit;
pub mod chat;
pub mod events;
pub mod jobs;
pub mod rules;
pub mod settings;

pub use audit::AuditSink;
pub use chat::ChatBackend;
pub use events::EventHandler;
pub use jobs::JobSubmitter;
pub use rules::RuleRepository;
pub use settings::SettingsProvider;
