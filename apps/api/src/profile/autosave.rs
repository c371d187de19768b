//! Coalescing write queue behind the profile store.
//!
//! Every in-memory change sends `Changed`. The first one opens a debounce
//! window; further changes push the deadline back. When the window elapses the
//! latest document is written once. `Flush` skips the wait and replies with
//! the write result. Changes that arrive while a write is in flight queue up
//! and open the next window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::profile::models::ProfileDocument;
use crate::profile::repository::ProfileRepository;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved { at: DateTime<Utc> },
    Failed { message: String },
}

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PersistError(pub String);

pub(crate) enum SaveSignal {
    Changed,
    Flush(oneshot::Sender<Result<(), PersistError>>),
}

/// The in-memory document plus revision counters. `revision` bumps on every
/// accepted change; `persisted_revision` records the newest revision written.
pub(crate) struct DocumentState {
    pub doc: ProfileDocument,
    pub revision: u64,
    pub persisted_revision: u64,
}

impl DocumentState {
    pub fn new(doc: ProfileDocument) -> Self {
        Self {
            doc,
            revision: 0,
            persisted_revision: 0,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.persisted_revision
    }
}

pub(crate) struct AutoSaver {
    pub state: Arc<RwLock<DocumentState>>,
    pub repo: Arc<dyn ProfileRepository>,
    pub signals: mpsc::UnboundedReceiver<SaveSignal>,
    pub status: watch::Sender<SaveStatus>,
    pub window: Duration,
}

impl AutoSaver {
    pub async fn run(mut self) {
        while let Some(signal) = self.signals.recv().await {
            let waiters = match signal {
                SaveSignal::Flush(reply) => vec![reply],
                SaveSignal::Changed => {
                    // A flush may already have written this change.
                    if !self.state.read().await.is_dirty() {
                        continue;
                    }
                    self.status.send_replace(SaveStatus::Pending);
                    self.wait_for_quiet().await
                }
            };

            let result = self.persist_if_dirty().await;
            for reply in waiters {
                let _ = reply.send(result.clone());
            }
        }
        debug!("Auto-save queue closed");
    }

    /// Sleeps until no change has arrived for a full window, or a flush is
    /// requested. Returns the flush requests to answer after the write.
    async fn wait_for_quiet(&mut self) -> Vec<oneshot::Sender<Result<(), PersistError>>> {
        let mut waiters = Vec::new();
        let deadline = tokio::time::sleep(self.window);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                signal = self.signals.recv() => match signal {
                    Some(SaveSignal::Changed) => {
                        deadline.as_mut().reset(Instant::now() + self.window);
                    }
                    Some(SaveSignal::Flush(reply)) => {
                        waiters.push(reply);
                        break;
                    }
                    None => break,
                },
            }
        }
        waiters
    }

    async fn persist_if_dirty(&self) -> Result<(), PersistError> {
        let (snapshot, revision) = {
            let state = self.state.read().await;
            if !state.is_dirty() {
                return Ok(());
            }
            (state.doc.clone(), state.revision)
        };

        self.status.send_replace(SaveStatus::Saving);
        match self.repo.write(&snapshot).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                state.persisted_revision = state.persisted_revision.max(revision);
                if state.is_dirty() {
                    // Newer edits are already queued for the next window.
                    self.status.send_replace(SaveStatus::Pending);
                } else {
                    self.status.send_replace(SaveStatus::Saved { at: Utc::now() });
                }
                info!("Persisted profile revision {revision}");
                Ok(())
            }
            Err(e) => {
                error!("Failed to persist profile revision {revision}: {e:?}");
                let message = e.to_string();
                self.status.send_replace(SaveStatus::Failed {
                    message: message.clone(),
                });
                Err(PersistError(message))
            }
        }
    }
}
