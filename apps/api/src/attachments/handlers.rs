use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::attachments::AttachmentRef;
use crate::auth::guard::Authenticated;
use crate::errors::AppError;
use crate::state::AppState;

/// A single file pulled out of a multipart body.
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Returns the first multipart field that carries a file name.
pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }
    Err(AppError::Validation(
        "Multipart body contains no file".to_string(),
    ))
}

/// POST /api/v1/attachments
pub async fn handle_upload(
    _auth: Authenticated,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AttachmentRef>, AppError> {
    let file = read_file_field(multipart).await?;
    let reference = state
        .attachments
        .upload_file(file.bytes, &file.name, file.content_type.as_deref())
        .await?;
    Ok(Json(reference))
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// POST /api/v1/attachments/url
pub async fn handle_accept_url(
    _auth: Authenticated,
    State(state): State<AppState>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<AttachmentRef>, AppError> {
    Ok(Json(state.attachments.accept_url(&req.url)?))
}
