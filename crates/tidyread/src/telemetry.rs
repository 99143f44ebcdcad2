// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber and Prometheus recorder setup.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tidyread_core::TidyreadError;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. Calling this twice is a no-op.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidyread={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

/// Install the Prometheus recorder globally.
///
/// Only one recorder can be installed per process; later calls fail.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, TidyreadError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        TidyreadError::Internal(format!("failed to install Prometheus recorder: {e}"))
    })?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}
