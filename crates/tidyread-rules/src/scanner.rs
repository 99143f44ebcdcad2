// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot reconciliation of chats that were left unread while offline.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use tidyread_core::types::{
    ActionLog, Chat, ChatId, ChatType, MessageQuery, MsgId, RuleType, TopicId,
};
use tidyread_core::{AuditSink, ChatBackend, JobSubmitter, TidyreadError};

use crate::REASON_AUTOREAD_RULE_STARTUP;
use crate::checker::GlobalChecker;
use crate::resolver::RuleResolver;

/// Counters from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub chats_seen: usize,
    /// Read jobs submitted (one per chat or topic).
    pub queued: usize,
    /// Chats skipped after an error.
    pub failed: usize,
}

/// A chat or forum topic considered by the scanner.
struct Scope<'a> {
    chat: &'a Chat,
    topic_id: Option<TopicId>,
    unread_count: i64,
}

impl Scope<'_> {
    fn display_name(&self) -> String {
        match self.topic_id {
            Some(topic) => format!("{} (Topic {topic})", self.chat.name),
            None => self.chat.name.clone(),
        }
    }

    fn link(&self) -> String {
        match self.topic_id {
            Some(topic) => format!("/forum/{}/topic/{topic}", self.chat.id),
            None => format!("/chat/{}", self.chat.id),
        }
    }
}

pub struct StartupScanner {
    resolver: Arc<RuleResolver>,
    checker: Arc<GlobalChecker>,
    backend: Arc<dyn ChatBackend>,
    jobs: Arc<dyn JobSubmitter>,
    audit: Arc<dyn AuditSink>,
    pause: Duration,
}

impl StartupScanner {
    pub fn new(
        resolver: Arc<RuleResolver>,
        checker: Arc<GlobalChecker>,
        backend: Arc<dyn ChatBackend>,
        jobs: Arc<dyn JobSubmitter>,
        audit: Arc<dyn AuditSink>,
        pause: Duration,
    ) -> Self {
        Self {
            resolver,
            checker,
            backend,
            jobs,
            audit,
            pause,
        }
    }

    /// Walk every unread chat once and queue the reads the rules call for.
    ///
    /// Failures are contained per chat. Only the initial chat listing can
    /// fail the whole scan.
    pub async fn scan(&self) -> Result<ScanReport, TidyreadError> {
        let mut report = ScanReport::default();
        if !self.backend.is_connected().await {
            info!("backend not connected, skipping startup scan");
            return Ok(report);
        }

        let chats = self.backend.get_all_unread_chats().await?;
        info!(chats = chats.len(), "startup scan started");

        for chat in &chats {
            report.chats_seen += 1;
            match self.scan_chat(chat).await {
                Ok(queued) => report.queued += queued,
                Err(e) => {
                    report.failed += 1;
                    warn!(chat_id = chat.id, error = %e, "startup scan failed for chat");
                }
            }
            tokio::task::yield_now().await;
            if !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        info!(
            chats_seen = report.chats_seen,
            queued = report.queued,
            failed = report.failed,
            "startup scan finished"
        );
        Ok(report)
    }

    async fn scan_chat(&self, chat: &Chat) -> Result<usize, TidyreadError> {
        if chat.chat_type != ChatType::Forum {
            let scope = Scope {
                chat,
                topic_id: None,
                unread_count: chat.unread_count,
            };
            return Ok(usize::from(self.scan_scope(&scope).await?));
        }

        let mut queued = 0;
        for topic in self.backend.get_unread_topics(chat.id).await? {
            let scope = Scope {
                chat,
                topic_id: Some(topic.id),
                unread_count: topic.unread_count,
            };
            if self.scan_scope(&scope).await? {
                queued += 1;
            }
        }
        Ok(queued)
    }

    /// Returns whether a read was queued for the scope.
    async fn scan_scope(&self, scope: &Scope<'_>) -> Result<bool, TidyreadError> {
        let chat_id = scope.chat.id;
        let rule = self
            .resolver
            .get_rule(chat_id, scope.topic_id, RuleType::Autoread)
            .await?;

        let (reason, max_id) = match rule {
            Some(_) => (REASON_AUTOREAD_RULE_STARTUP.to_string(), None),
            None => match self.heuristic(chat_id, scope).await? {
                Some(hit) => hit,
                None => return Ok(false),
            },
        };

        self.jobs
            .enqueue_mark_read(chat_id, scope.topic_id, max_id)
            .await?;
        debug!(chat_id, topic_id = ?scope.topic_id, %reason, "startup read queued");

        let entry = ActionLog::now(
            "startup_read_queued",
            chat_id,
            scope.display_name(),
            reason,
            scope.link(),
        );
        if let Err(e) = self.audit.add_log(entry).await {
            warn!(chat_id, error = %e, "failed to write audit log");
        }
        Ok(true)
    }

    /// Run the heuristics against the newest message when exactly one is unread.
    async fn heuristic(
        &self,
        chat_id: ChatId,
        scope: &Scope<'_>,
    ) -> Result<Option<(String, Option<MsgId>)>, TidyreadError> {
        if scope.unread_count != 1 {
            return Ok(None);
        }
        let messages = self
            .backend
            .get_messages(MessageQuery::latest(chat_id, scope.topic_id, 1))
            .await?;
        let Some(newest) = messages.first() else {
            return Ok(None);
        };
        Ok(self
            .checker
            .check(newest, scope.unread_count)
            .await
            .map(|reason| (reason, Some(newest.id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyread_core::types::{GlobalUserSettings, Message, Topic};
    use tidyread_test_utils::{
        BackendOp, MemoryStore, MockBackend, MockFailure, RecordingJobs, SubmittedJob,
    };

    struct Fixture {
        scanner: StartupScanner,
        store: Arc<MemoryStore>,
        backend: Arc<MockBackend>,
        jobs: Arc<RecordingJobs>,
        resolver: Arc<RuleResolver>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(MockBackend::new());
        let jobs = Arc::new(RecordingJobs::new());
        let resolver = Arc::new(RuleResolver::new(store.clone(), 1));
        let checker = Arc::new(GlobalChecker::new(store.clone()));
        let scanner = StartupScanner::new(
            resolver.clone(),
            checker,
            backend.clone(),
            jobs.clone(),
            store.clone(),
            Duration::ZERO,
        );
        Fixture {
            scanner,
            store,
            backend,
            jobs,
            resolver,
        }
    }

    fn group(id: ChatId, unread: i64) -> Chat {
        Chat {
            id,
            name: format!("group {id}"),
            unread_count: unread,
            chat_type: ChatType::Group,
            unread_topics_count: None,
        }
    }

    fn poll(id: MsgId) -> Message {
        Message {
            id,
            is_poll: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disconnected_backend_skips_scan() {
        let f = fixture();
        f.backend.add_chat(group(1, 3));
        f.backend.set_connected(false);
        let report = f.scanner.scan().await.unwrap();
        assert_eq!(report, ScanReport::default());
        assert_eq!(f.backend.attempts(BackendOp::GetUnreadChats), 0);
    }

    #[tokio::test]
    async fn explicit_rule_reads_whole_backlog() {
        let f = fixture();
        f.backend.add_chat(group(1, 40));
        f.resolver
            .toggle_rule(1, None, RuleType::Autoread, true, None)
            .await
            .unwrap();

        let report = f.scanner.scan().await.unwrap();
        assert_eq!(report.queued, 1);
        assert_eq!(
            f.jobs.submitted(),
            vec![SubmittedJob::MarkRead {
                chat_id: 1,
                topic_id: None,
                max_id: None
            }]
        );
        let logs = f.store.logs();
        assert_eq!(logs[0].action, "startup_read_queued");
        assert_eq!(logs[0].reason, "autoread_rule_startup");
        assert_eq!(logs[0].link, "/chat/1");
    }

    #[tokio::test]
    async fn heuristic_applies_only_to_single_unread() {
        let f = fixture();
        f.store.set_settings(GlobalUserSettings {
            autoread_polls: true,
            ..Default::default()
        });
        f.backend.add_chat(group(1, 1));
        f.backend.add_message(1, None, poll(9));
        f.backend.add_chat(group(2, 2));
        f.backend.add_message(2, None, poll(3));

        let report = f.scanner.scan().await.unwrap();
        assert_eq!(report.chats_seen, 2);
        assert_eq!(report.queued, 1);
        assert_eq!(
            f.jobs.submitted(),
            vec![SubmittedJob::MarkRead {
                chat_id: 1,
                topic_id: None,
                max_id: Some(9)
            }]
        );
        assert_eq!(f.store.logs()[0].reason, "global_poll");
    }

    #[tokio::test]
    async fn forum_topics_are_scanned_individually() {
        let f = fixture();
        f.backend.add_forum(
            -100,
            "Forum",
            vec![
                Topic { id: 1, name: "a".into(), unread_count: 5 },
                Topic { id: 2, name: "b".into(), unread_count: 5 },
            ],
        );
        f.resolver
            .toggle_rule(-100, Some(2), RuleType::Autoread, true, None)
            .await
            .unwrap();

        let report = f.scanner.scan().await.unwrap();
        assert_eq!(report.queued, 1);
        assert_eq!(
            f.jobs.submitted(),
            vec![SubmittedJob::MarkRead {
                chat_id: -100,
                topic_id: Some(2),
                max_id: None
            }]
        );
        let log = &f.store.logs()[0];
        assert_eq!(log.chat_name, "Forum (Topic 2)");
        assert_eq!(log.link, "/forum/-100/topic/2");
    }

    #[tokio::test]
    async fn failing_chat_does_not_stop_scan() {
        let f = fixture();
        f.store.set_settings(GlobalUserSettings {
            autoread_polls: true,
            ..Default::default()
        });
        f.backend.add_chat(group(1, 1));
        f.backend.add_chat(group(2, 1));
        f.backend.add_message(2, None, poll(4));
        f.backend
            .push_failures(BackendOp::GetMessages, MockFailure::Backend("boom".into()), 1);

        let report = f.scanner.scan().await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.queued, 1);
        assert_eq!(f.jobs.submitted().len(), 1);
    }

    #[tokio::test]
    async fn listing_failure_fails_scan() {
        let f = fixture();
        f.backend.push_failures(
            BackendOp::GetUnreadChats,
            MockFailure::Backend("down".into()),
            1,
        );
        assert!(f.scanner.scan().await.is_err());
    }
}
