// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON HTTP API for tidyread.
//!
//! Exposes the rule toggles, the dead-letter log, the audit log and the rule
//! simulator. API responses are JSON and failures use `{"error": "..."}`;
//! `/metrics` serves the Prometheus text format.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, MetricsRender, router, start_server};
