// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these.
//! Without a recorder every call is a no-op.

use metrics::describe_counter;

/// Register all tidyread metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("tidyread_events_total", "Events published on the bus");
    describe_counter!("tidyread_jobs_total", "Job executions by function and outcome");
    describe_counter!(
        "tidyread_flood_waits_total",
        "Rate-limit responses that engaged the flood lock"
    );
    describe_counter!(
        "tidyread_dead_letters_total",
        "Jobs abandoned after exhausting their retries"
    );
}

/// Record one job execution.
pub fn record_job(function: &str, outcome: &str) {
    metrics::counter!(
        "tidyread_jobs_total",
        "function" => function.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_flood_wait() {
    metrics::counter!("tidyread_flood_waits_total").increment(1);
}

pub fn record_dead_letter() {
    metrics::counter!("tidyread_dead_letters_total").increment(1);
}
