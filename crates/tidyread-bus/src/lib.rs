// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus delivering [`SystemEvent`]s to every subscriber concurrently.
//!
//! `publish` spawns one task per handler and waits for all of them. A handler
//! that returns an error or panics is logged and counted; it never affects
//! the publisher or the other handlers. No ordering between handlers is
//! guaranteed.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use tidyread_core::{EventHandler, SystemEvent};

/// Result of one `publish` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Fan-out publish/subscribe hub.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every subsequent publish.
    pub async fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        debug!(handler = handler.name(), "event handler subscribed");
        self.handlers.write().await.push(handler);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Deliver `event` to every handler and wait until all have finished.
    ///
    /// Handlers see clones of `event` that share its read flag, so a handler
    /// marking the event read is visible to the caller afterwards.
    pub async fn publish(&self, event: &SystemEvent) -> PublishSummary {
        metrics::counter!("tidyread_events_total", "kind" => event.kind.to_string()).increment(1);

        let handlers = self.handlers.read().await.clone();
        if handlers.is_empty() {
            return PublishSummary::default();
        }

        let event = Arc::new(event.clone());
        let mut set = JoinSet::new();
        for handler in handlers {
            let event = Arc::clone(&event);
            set.spawn(async move {
                let result = handler.handle(&event).await;
                (handler, result)
            });
        }

        let mut summary = PublishSummary::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(()))) => summary.delivered += 1,
                Ok((handler, Err(e))) => {
                    summary.failed += 1;
                    warn!(
                        handler = handler.name(),
                        kind = %event.kind,
                        chat_id = ?event.chat_id,
                        error = %e,
                        "event handler failed"
                    );
                }
                Err(join_err) => {
                    summary.failed += 1;
                    error!(
                        kind = %event.kind,
                        chat_id = ?event.chat_id,
                        panicked = join_err.is_panic(),
                        "event handler task aborted"
                    );
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tidyread_core::{Message, TidyreadError};
    use tokio::sync::Barrier;

    struct Counting {
        name: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Counting {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, _event: &SystemEvent) -> Result<(), TidyreadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn handle(&self, _event: &SystemEvent) -> Result<(), TidyreadError> {
            Err(TidyreadError::Internal("handler exploded".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl EventHandler for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn handle(&self, _event: &SystemEvent) -> Result<(), TidyreadError> {
            panic!("boom");
        }
    }

    struct MarksRead;

    #[async_trait]
    impl EventHandler for MarksRead {
        fn name(&self) -> &str {
            "marks_read"
        }

        async fn handle(&self, event: &SystemEvent) -> Result<(), TidyreadError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            event.read.mark();
            Ok(())
        }
    }

    /// Completes only when `parties` handlers are inside `handle` at once.
    struct Rendezvous(Arc<Barrier>);

    #[async_trait]
    impl EventHandler for Rendezvous {
        fn name(&self) -> &str {
            "rendezvous"
        }

        async fn handle(&self, _event: &SystemEvent) -> Result<(), TidyreadError> {
            self.0.wait().await;
            Ok(())
        }
    }

    fn event() -> SystemEvent {
        SystemEvent::new_message(100, "chat", Message::default())
    }

    fn counting(name: &'static str) -> Arc<Counting> {
        Arc::new(Counting {
            name,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&event()).await, PublishSummary::default());
    }

    #[tokio::test]
    async fn every_handler_receives_event() {
        let bus = EventBus::new();
        let a = counting("a");
        let b = counting("b");
        bus.subscribe(a.clone()).await;
        bus.subscribe(b.clone()).await;

        let summary = bus.publish(&event()).await;
        assert_eq!(summary.delivered, 2);
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn failures_and_panics_are_isolated() {
        let bus = EventBus::new();
        let ok = counting("ok");
        bus.subscribe(Arc::new(Failing)).await;
        bus.subscribe(Arc::new(Panicking)).await;
        bus.subscribe(ok.clone()).await;

        let summary = bus.publish(&event()).await;
        assert_eq!(summary, PublishSummary { delivered: 1, failed: 2 });
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_waits_for_slow_handlers() {
        let bus = EventBus::new();
        bus.subscribe(Arc::new(MarksRead)).await;
        let ev = event();
        bus.publish(&ev).await;
        assert!(ev.is_read());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn handlers_run_concurrently() {
        let bus = EventBus::new();
        let barrier = Arc::new(Barrier::new(3));
        for _ in 0..3 {
            bus.subscribe(Arc::new(Rendezvous(barrier.clone()))).await;
        }
        let summary = tokio::time::timeout(Duration::from_secs(5), bus.publish(&event()))
            .await
            .expect("handlers must not run one after another");
        assert_eq!(summary.delivered, 3);
    }
}
