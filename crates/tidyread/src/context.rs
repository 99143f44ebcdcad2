// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application context: every service built once and wired explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tidyread_bus::{EventBus, PublishSummary};
use tidyread_config::TidyreadConfig;
use tidyread_core::{ChatBackend, SystemEvent, TidyreadError};
use tidyread_gateway::{GatewayState, MetricsRender};
use tidyread_queue::{DeadLetterLog, JobExecutor, JobQueue, WorkerPool};
use tidyread_rules::{GlobalChecker, RuleResolver, RuleService, RuleSimulator, StartupScanner};
use tidyread_storage::SqliteStorage;

type TaskResult = Result<(), TidyreadError>;

/// Owns the storage handle and every service built on top of it.
///
/// The backend is supplied by the embedder; everything else is derived from
/// the config.
pub struct AppContext {
    pub config: TidyreadConfig,
    pub storage: Arc<SqliteStorage>,
    pub backend: Arc<dyn ChatBackend>,
    pub bus: Arc<EventBus>,
    pub resolver: Arc<RuleResolver>,
    pub checker: Arc<GlobalChecker>,
    pub service: Arc<RuleService>,
    pub simulator: Arc<RuleSimulator>,
    pub queue: JobQueue,
    pub dead_letters: DeadLetterLog,
    pub workers: Arc<WorkerPool>,
    /// Present when `metrics.enabled` and the recorder could be installed.
    pub metrics: Option<PrometheusHandle>,
    subscribed: AtomicBool,
}

impl AppContext {
    /// Open storage (running migrations) and construct all services.
    pub async fn build(
        config: TidyreadConfig,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, TidyreadError> {
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        Self::with_storage(config, storage, backend)
    }

    /// Construct all services over an already initialized storage.
    pub fn with_storage(
        config: TidyreadConfig,
        storage: Arc<SqliteStorage>,
        backend: Arc<dyn ChatBackend>,
    ) -> Result<Self, TidyreadError> {
        let db = storage.database()?.clone();

        let resolver = Arc::new(RuleResolver::new(storage.clone(), config.app.owner_id));
        let checker = Arc::new(GlobalChecker::new(storage.clone()));
        let queue = JobQueue::new(db.clone(), config.queue.clone());
        let dead_letters = DeadLetterLog::new(db.clone(), config.queue.dead_letter_retention_secs);

        let service = Arc::new(RuleService::new(
            resolver.clone(),
            checker.clone(),
            backend.clone(),
            Arc::new(queue.clone()),
            storage.clone(),
            config.rules.clone(),
        ));
        let simulator = Arc::new(RuleSimulator::new(
            resolver.clone(),
            checker.clone(),
            backend.clone(),
            config.rules.default_reaction_emoji.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(backend.clone()));
        let workers = Arc::new(WorkerPool::new(db, executor, config.queue.clone()));

        let metrics = if config.metrics.enabled {
            match crate::telemetry::install_metrics_recorder() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                    None
                }
            }
        } else {
            debug!("prometheus metrics disabled by configuration");
            None
        };

        Ok(Self {
            config,
            storage,
            backend,
            bus: Arc::new(EventBus::new()),
            resolver,
            checker,
            service,
            simulator,
            queue,
            dead_letters,
            workers,
            metrics,
            subscribed: AtomicBool::new(false),
        })
    }

    /// Deliver a backend event to every subscribed handler.
    pub async fn publish(&self, event: &SystemEvent) -> PublishSummary {
        self.bus.publish(event).await
    }

    pub fn startup_scanner(&self) -> StartupScanner {
        StartupScanner::new(
            self.resolver.clone(),
            self.checker.clone(),
            self.backend.clone(),
            Arc::new(self.queue.clone()),
            self.storage.clone(),
            self.config.scanner.pause(),
        )
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState {
            resolver: self.resolver.clone(),
            simulator: self.simulator.clone(),
            backend: self.backend.clone(),
            audit: self.storage.clone(),
            queue: self.queue.clone(),
            dead_letters: self.dead_letters.clone(),
            start_time: Instant::now(),
            metrics_render: self.metrics.clone().map(|handle| {
                let render: MetricsRender = Arc::new(move || handle.render());
                render
            }),
        }
    }

    /// Subscribe the rule service and spawn the long-running tasks.
    ///
    /// Returns the task set; every task exits once `cancel` fires. The
    /// worker pool drains in-flight jobs within `queue.shutdown_grace_secs`.
    /// The rule service is subscribed on the first call only.
    pub async fn start(&self, cancel: CancellationToken) -> JoinSet<TaskResult> {
        tidyread_queue::metrics::register_metrics();
        if !self.subscribed.swap(true, Ordering::AcqRel) {
            self.bus.subscribe(self.service.clone()).await;
        }

        let mut tasks = JoinSet::new();

        let workers = self.workers.clone();
        let token = cancel.clone();
        tasks.spawn(async move {
            workers.run(token).await;
            Ok(())
        });

        if self.config.scanner.enabled {
            let scanner = self.startup_scanner();
            let token = cancel.clone();
            tasks.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => info!("startup scan interrupted by shutdown"),
                    result = scanner.scan() => match result {
                        Ok(report) => info!(
                            chats = report.chats_seen,
                            queued = report.queued,
                            failed = report.failed,
                            "startup scan finished"
                        ),
                        Err(e) => warn!(error = %e, "startup scan failed"),
                    },
                }
                Ok(())
            });
        }

        if self.config.gateway.enabled {
            let gateway = self.config.gateway.clone();
            let state = self.gateway_state();
            let token = cancel.clone();
            tasks.spawn(async move { tidyread_gateway::start_server(&gateway, state, token).await });
        }

        info!(
            workers = self.config.queue.workers,
            scanner = self.config.scanner.enabled,
            gateway = self.config.gateway.enabled,
            "tidyread started"
        );
        tasks
    }

    /// Run until `cancel` fires, then shut down and close storage.
    ///
    /// A task failing with an error cancels the rest; its error is returned
    /// once everything has stopped.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TidyreadError> {
        let mut tasks = self.start(cancel.clone()).await;
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "task failed, shutting down");
                    cancel.cancel();
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!(error = %e, "task panicked, shutting down");
                    cancel.cancel();
                    first_error.get_or_insert(TidyreadError::Internal(format!("task panicked: {e}")));
                }
            }
        }

        self.storage.close().await?;
        info!("tidyread stopped");
        first_error.map_or(Ok(()), Err)
    }
}
