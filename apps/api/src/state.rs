use std::sync::Arc;

use crate::attachments::AttachmentService;
use crate::auth::session::SessionManager;
use crate::profile::repository::ProfileRepository;
use crate::profile::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// The editor's in-memory document and its auto-save queue.
    pub profile: ProfileStore,
    pub attachments: AttachmentService,
    /// Direct repository access for the public view, which must only ever
    /// show what has been persisted.
    pub public_repo: Arc<dyn ProfileRepository>,
}
