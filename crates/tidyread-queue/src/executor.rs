// SPDX-FileCopyrightText: 2026 Tidyread Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a decoded job against the chat backend.

use std::sync::Arc;

use tracing::{debug, info};

use tidyread_core::{ChatBackend, TidyreadError};

use crate::job::JobCall;

/// How a successful call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    Done,
    /// The backend declined without raising (e.g. reactions disabled).
    Declined,
}

pub struct JobExecutor {
    backend: Arc<dyn ChatBackend>,
}

impl JobExecutor {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub async fn execute(&self, call: &JobCall) -> Result<Execution, TidyreadError> {
        if !self.backend.is_connected().await {
            return Err(TidyreadError::NotConnected);
        }

        match call {
            JobCall::MarkAsRead {
                chat_id,
                topic_id,
                max_id,
            } => {
                self.backend.mark_as_read(*chat_id, *topic_id, *max_id).await?;
                info!(chat_id, ?topic_id, ?max_id, "marked as read");
                Ok(Execution::Done)
            }
            JobCall::SendReaction {
                chat_id,
                msg_id,
                emoji,
            } => {
                if self.backend.send_reaction(*chat_id, *msg_id, emoji).await? {
                    info!(chat_id, msg_id, %emoji, "reaction sent");
                    Ok(Execution::Done)
                } else {
                    debug!(chat_id, msg_id, %emoji, "reaction declined by backend");
                    Ok(Execution::Declined)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidyread_test_utils::MockBackend;

    #[tokio::test]
    async fn disconnected_backend_is_not_called() {
        let backend = Arc::new(MockBackend::new());
        backend.set_connected(false);
        let executor = JobExecutor::new(backend.clone());
        let call = JobCall::MarkAsRead {
            chat_id: 1,
            topic_id: None,
            max_id: None,
        };
        let err = executor.execute(&call).await.unwrap_err();
        assert!(matches!(err, TidyreadError::NotConnected));
        assert!(backend.reads().is_empty());
    }

    #[tokio::test]
    async fn declined_reaction_is_reported() {
        let backend = Arc::new(MockBackend::new());
        backend.set_reactions_enabled(false);
        let executor = JobExecutor::new(backend);
        let call = JobCall::SendReaction {
            chat_id: 1,
            msg_id: 2,
            emoji: "👍".into(),
        };
        assert_eq!(executor.execute(&call).await.unwrap(), Execution::Declined);
    }
}
