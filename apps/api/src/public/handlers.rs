use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::profile::models::ProfileDocument;
use crate::profile::tabs::default_document;
use crate::public::{copy_text, public_view, render_markdown, ExportFormat};
use crate::state::AppState;

/// Always the persisted copy; unsaved editor changes are not visible here.
async fn load_public(state: &AppState) -> Result<ProfileDocument, AppError> {
    let doc = state.public_repo.fetch().await?.unwrap_or_else(default_document);
    Ok(public_view(doc))
}

/// GET /api/v1/public/profile
pub async fn handle_public_profile(
    State(state): State<AppState>,
) -> Result<Json<ProfileDocument>, AppError> {
    Ok(Json(load_public(&state).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// GET /api/v1/public/profile/export?format=json|markdown
pub async fn handle_export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let format = ExportFormat::parse(query.format.as_deref()).ok_or_else(|| {
        AppError::Validation("format must be 'json' or 'markdown'".to_string())
    })?;
    let doc = load_public(&state).await?;

    let body = match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(&doc).map_err(|e| AppError::Internal(e.into()))?
        }
        ExportFormat::Markdown => render_markdown(&doc),
    };

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];
    Ok((headers, body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CopyQuery {
    pub path: String,
}

/// GET /api/v1/public/profile/copy?path=/basic_info/email
pub async fn handle_copy(
    State(state): State<AppState>,
    Query(query): Query<CopyQuery>,
) -> Result<Response, AppError> {
    let doc = load_public(&state).await?;
    let text = copy_text(&doc, &query.path)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response())
}
