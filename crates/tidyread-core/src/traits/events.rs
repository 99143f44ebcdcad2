// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus subscriber port.

use async_trait::async_trait;

use crate::error::TidyreadError;
use crate::types::SystemEvent;

/// A subscriber on the event bus.
///
/// Handlers run concurrently for the same event; an error from one handler
/// never affects the others.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: &SystemEvent) -> Result<(), TidyreadError>;
}
