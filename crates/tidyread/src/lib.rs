// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tidyread wires the rule engine, job queue and HTTP API around a
//! [`ChatBackend`](tidyread_core::ChatBackend) supplied by the embedder.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn demo(backend: Arc<dyn tidyread_core::ChatBackend>) -> Result<(), tidyread_core::TidyreadError> {
//! let config = tidyread_config::TidyreadConfig::default();
//! let ctx = tidyread::AppContext::build(config, backend).await?;
//! let cancel = tidyread::shutdown::install_signal_handler();
//! ctx.run(cancel).await
//! # }
//! ```

pub mod context;
pub mod shutdown;
pub mod telemetry;

pub use context::AppContext;
