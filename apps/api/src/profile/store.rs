use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::profile::autosave::{AutoSaver, DocumentState, PersistError, SaveSignal, SaveStatus};
use crate::profile::field_path;
use crate::profile::models::{CustomField, CustomValue, ProfileDocument, TabDefinition};
use crate::profile::normalize;
use crate::profile::repository::ProfileRepository;
use crate::profile::sections::{self, SectionEntry};
use crate::profile::tabs;

/// In-memory owner of the profile document. All edits funnel through
/// [`ProfileStore::mutate_with`], which commits the change and queues a
/// debounced write.
#[derive(Clone)]
pub struct ProfileStore {
    state: Arc<RwLock<DocumentState>>,
    repo: Arc<dyn ProfileRepository>,
    signals: mpsc::UnboundedSender<SaveSignal>,
    status: watch::Receiver<SaveStatus>,
}

impl ProfileStore {
    /// Creates the store and starts its auto-save task on the current runtime.
    pub fn spawn(repo: Arc<dyn ProfileRepository>, debounce: Duration) -> Self {
        let state = Arc::new(RwLock::new(DocumentState::new(tabs::default_document())));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);

        let saver = AutoSaver {
            state: state.clone(),
            repo: repo.clone(),
            signals: signal_rx,
            status: status_tx,
            window: debounce,
        };
        tokio::spawn(saver.run());

        Self {
            state,
            repo,
            signals: signal_tx,
            status: status_rx,
        }
    }

    /// Fetches the persisted document, or the default shape when none exists.
    /// Unsaved in-memory edits are never overwritten.
    pub async fn load(&self) -> Result<ProfileDocument, AppError> {
        let fetched = self.repo.fetch().await?;

        let mut state = self.state.write().await;
        if state.is_dirty() {
            warn!("Skipping profile reload: unsaved edits are pending");
            return Ok(state.doc.clone());
        }

        let mut doc = match fetched {
            Some(doc) => doc,
            None => {
                info!("No stored profile found, starting from the default document");
                tabs::default_document()
            }
        };
        normalize(&mut doc);
        state.doc = doc.clone();
        Ok(doc)
    }

    pub async fn snapshot(&self) -> ProfileDocument {
        self.state.read().await.doc.clone()
    }

    pub async fn is_dirty(&self) -> bool {
        self.state.read().await.is_dirty()
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    /// Runs `change` against a working copy. Only a successful change is
    /// committed and scheduled for persistence.
    pub async fn mutate_with<T, F>(&self, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut ProfileDocument) -> Result<T, AppError>,
    {
        let mut state = self.state.write().await;
        let mut working = state.doc.clone();
        let output = change(&mut working)?;

        state.doc = working;
        state.revision += 1;
        drop(state);

        if self.signals.send(SaveSignal::Changed).is_err() {
            warn!("Auto-save task is gone; change kept in memory only");
        }
        Ok(output)
    }

    /// Field-level edit addressed by JSON pointer.
    pub async fn mutate(&self, path: &str, value: Value) -> Result<ProfileDocument, AppError> {
        self.mutate_with(|doc| {
            let mut updated = field_path::apply(doc, path, value)?;
            normalize(&mut updated);
            *doc = updated.clone();
            Ok(updated)
        })
        .await
    }

    /// Writes pending changes now and waits for the outcome.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.signals
            .send(SaveSignal::Flush(reply_tx))
            .map_err(|_| PersistError("auto-save task is not running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| PersistError("auto-save task stopped before replying".to_string()))?
    }

    pub async fn draft<T: SectionEntry>(&self) -> T {
        sections::draft(&self.state.read().await.doc)
    }

    pub async fn save_entry<T: SectionEntry>(&self, entry: T) -> Result<T, AppError> {
        self.mutate_with(|doc| Ok(sections::upsert(doc, entry)?)).await
    }

    pub async fn delete_entry<T: SectionEntry>(&self, id: Uuid) -> Result<T, AppError> {
        self.mutate_with(|doc| {
            sections::remove::<T>(doc, id).ok_or_else(|| entry_not_found::<T>(id))
        })
        .await
    }

    /// Moves an entry and returns the section in its new order.
    pub async fn move_entry<T: SectionEntry>(
        &self,
        id: Uuid,
        position: usize,
    ) -> Result<Vec<T>, AppError> {
        self.mutate_with(|doc| {
            sections::reorder::<T>(doc, id, position).ok_or_else(|| entry_not_found::<T>(id))?;
            Ok(T::list(doc).clone())
        })
        .await
    }

    pub async fn add_tab(&self, label: &str) -> Result<TabDefinition, AppError> {
        self.mutate_with(|doc| Ok(tabs::add_custom_tab(doc, label)?)).await
    }

    pub async fn rename_tab(&self, id: &str, label: &str) -> Result<TabDefinition, AppError> {
        self.mutate_with(|doc| Ok(tabs::rename_tab(doc, id, label)?)).await
    }

    pub async fn delete_tab(&self, id: &str) -> Result<TabDefinition, AppError> {
        self.mutate_with(|doc| Ok(tabs::delete_tab(doc, id)?)).await
    }

    pub async fn move_tab(&self, id: &str, position: usize) -> Result<Vec<TabDefinition>, AppError> {
        self.mutate_with(|doc| {
            tabs::move_tab(doc, id, position)?;
            Ok(doc.tabs.clone())
        })
        .await
    }

    /// Replaces a custom field's value once the caller has a valid reference.
    pub async fn set_custom_value(&self, id: Uuid, value: CustomValue) -> Result<CustomField, AppError> {
        self.mutate_with(|doc| {
            let pos = sections::position_of::<CustomField>(doc, id)
                .ok_or_else(|| entry_not_found::<CustomField>(id))?;
            let mut field = doc.custom_fields[pos].clone();
            field.value = value;
            Ok(sections::upsert(doc, field)?)
        })
        .await
    }
}

fn entry_not_found<T: SectionEntry>(id: Uuid) -> AppError {
    AppError::NotFound(format!("{} entry {id} not found", T::KIND.as_str()))
}
