use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::guard::{bearer_token, Authenticated};
use crate::auth::session::{LoginOutcome, Preferences, Session, SessionState, Theme};
use crate::errors::AppError;
use crate::profile::autosave::SaveStatus;
use crate::profile::tabs;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginOutcome>, AppError> {
    let outcome = state.sessions.login(&req.username, &req.password).await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub state: SessionState,
    pub session: Session,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub state: SessionState,
    pub save_status: SaveStatus,
}

/// POST /api/v1/auth/logout
/// Pending profile edits are flushed before the session is destroyed. A failed
/// flush keeps the edits in memory and does not block the logout.
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AppError> {
    let ctx = state.sessions.context(bearer_token(&headers)).await?;
    if let Some(token) = ctx.token() {
        if let Err(e) = state.profile.flush().await {
            warn!("Flush on logout failed: {e}");
        }
        state.sessions.logout(token).await?;
    }
    Ok(Json(LogoutResponse {
        state: SessionState::LoggedOut,
        save_status: state.profile.status(),
    }))
}

/// GET /api/v1/auth/session
pub async fn handle_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let ctx = state.sessions.context(bearer_token(&headers)).await?;
    Ok(Json(SessionResponse {
        state: ctx.state(),
        session: ctx.session(),
    }))
}

/// GET /api/v1/preferences
pub async fn handle_get_preferences(
    auth: Authenticated,
    State(state): State<AppState>,
) -> Result<Json<Preferences>, AppError> {
    Ok(Json(state.sessions.preferences(auth.token).await?))
}

#[derive(Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<String>,
    pub active_tab: Option<String>,
}

/// PUT /api/v1/preferences
pub async fn handle_update_preferences(
    auth: Authenticated,
    State(state): State<AppState>,
    Json(req): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>, AppError> {
    let theme = req
        .theme
        .as_deref()
        .map(|raw| {
            Theme::parse(raw.trim()).ok_or_else(|| {
                AppError::Validation("theme must be one of light, dark, system".to_string())
            })
        })
        .transpose()?;

    if let Some(tab_id) = req.active_tab.as_deref() {
        if !tabs::tab_exists(&state.profile.snapshot().await, tab_id) {
            return Err(AppError::Validation(format!("Unknown tab '{tab_id}'")));
        }
    }

    if let Some(theme) = theme {
        state.sessions.set_theme(auth.token, theme).await?;
    }
    if let Some(tab_id) = req.active_tab.as_deref() {
        state.sessions.set_active_tab(auth.token, tab_id).await?;
    }

    Ok(Json(state.sessions.preferences(auth.token).await?))
}
