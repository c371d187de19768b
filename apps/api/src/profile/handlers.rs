use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::attachments::handlers::{read_file_field, UrlRequest};
use crate::attachments::AttachmentError;
use crate::auth::guard::Authenticated;
use crate::errors::AppError;
use crate::profile::autosave::{PersistError, SaveStatus};
use crate::profile::field_path;
use crate::profile::models::{
    Certificate, Contact, CoverLetter, CustomField, CustomValue, Education, Language,
    ProfileDocument, SectionKind, Skill, SocialProfile, TabDefinition, Tool, WorkExperience,
};
use crate::profile::sections;
use crate::state::AppState;

/// Binds `$T` to the entry type of a runtime [`SectionKind`] and evaluates `$body`.
macro_rules! with_section_type {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            SectionKind::Contacts => {
                type $T = Contact;
                $body
            }
            SectionKind::Tools => {
                type $T = Tool;
                $body
            }
            SectionKind::WorkExperience => {
                type $T = WorkExperience;
                $body
            }
            SectionKind::Education => {
                type $T = Education;
                $body
            }
            SectionKind::Skills => {
                type $T = Skill;
                $body
            }
            SectionKind::Certificates => {
                type $T = Certificate;
                $body
            }
            SectionKind::Languages => {
                type $T = Language;
                $body
            }
            SectionKind::CustomFields => {
                type $T = CustomField;
                $body
            }
            SectionKind::CoverLetters => {
                type $T = CoverLetter;
                $body
            }
            SectionKind::SocialProfiles => {
                type $T = SocialProfile;
                $body
            }
        }
    };
}

impl From<PersistError> for AppError {
    fn from(err: PersistError) -> Self {
        AppError::Persist(err.0)
    }
}

fn to_json<S: Serialize>(value: S) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub document: ProfileDocument,
    pub save_status: SaveStatus,
}

#[derive(Serialize)]
pub struct EditResponse<T: Serialize> {
    pub data: T,
    pub save_status: SaveStatus,
}

fn edited<T: Serialize>(state: &AppState, data: T) -> Json<EditResponse<T>> {
    Json(EditResponse {
        data,
        save_status: state.profile.status(),
    })
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    _auth: Authenticated,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(ProfileResponse {
        document: state.profile.snapshot().await,
        save_status: state.profile.status(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    pub path: String,
    pub value: Value,
}

/// PATCH /api/v1/profile/fields
pub async fn handle_update_field(
    _auth: Authenticated,
    State(state): State<AppState>,
    Json(req): Json<FieldUpdate>,
) -> Result<Json<EditResponse<Value>>, AppError> {
    let doc = state.profile.mutate(&req.path, req.value).await?;
    let value = field_path::read(&doc, &req.path)?;
    Ok(edited(&state, value))
}

/// GET /api/v1/profile/save-status
pub async fn handle_save_status(
    _auth: Authenticated,
    State(state): State<AppState>,
) -> Json<SaveStatus> {
    Json(state.profile.status())
}

/// POST /api/v1/profile/flush
/// Called by the dashboard when the user navigates away.
pub async fn handle_flush(
    _auth: Authenticated,
    State(state): State<AppState>,
) -> Result<Json<SaveStatus>, AppError> {
    state.profile.flush().await?;
    Ok(Json(state.profile.status()))
}

/// POST /api/v1/profile/sections/:section/draft
pub async fn handle_draft_entry(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(section): Path<SectionKind>,
) -> Result<Json<Value>, AppError> {
    let draft = with_section_type!(section, T => to_json(state.profile.draft::<T>().await)?);
    Ok(Json(draft))
}

/// PUT /api/v1/profile/sections/:section/entries
pub async fn handle_save_entry(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(section): Path<SectionKind>,
    Json(body): Json<Value>,
) -> Result<Json<EditResponse<Value>>, AppError> {
    let saved = with_section_type!(section, T => {
        let entry: T = serde_json::from_value(body)
            .map_err(|e| AppError::Validation(format!("Invalid {} entry: {e}", section.as_str())))?;
        to_json(state.profile.save_entry(entry).await?)?
    });
    Ok(edited(&state, saved))
}

/// DELETE /api/v1/profile/sections/:section/entries/:id
pub async fn handle_delete_entry(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path((section, id)): Path<(SectionKind, Uuid)>,
) -> Result<StatusCode, AppError> {
    with_section_type!(section, T => {
        state.profile.delete_entry::<T>(id).await?;
    });
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub position: usize,
}

/// POST /api/v1/profile/sections/:section/entries/:id/move
pub async fn handle_move_entry(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path((section, id)): Path<(SectionKind, Uuid)>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<EditResponse<Value>>, AppError> {
    let entries = with_section_type!(section, T => {
        to_json(state.profile.move_entry::<T>(id, req.position).await?)?
    });
    Ok(edited(&state, entries))
}

/// GET /api/v1/profile/tabs
pub async fn handle_list_tabs(
    _auth: Authenticated,
    State(state): State<AppState>,
) -> Json<Vec<TabDefinition>> {
    Json(state.profile.snapshot().await.tabs)
}

#[derive(Debug, Deserialize)]
pub struct TabLabel {
    pub label: String,
}

/// POST /api/v1/profile/tabs
pub async fn handle_add_tab(
    _auth: Authenticated,
    State(state): State<AppState>,
    Json(req): Json<TabLabel>,
) -> Result<(StatusCode, Json<EditResponse<TabDefinition>>), AppError> {
    let tab = state.profile.add_tab(&req.label).await?;
    Ok((StatusCode::CREATED, edited(&state, tab)))
}

/// PATCH /api/v1/profile/tabs/:id
pub async fn handle_rename_tab(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TabLabel>,
) -> Result<Json<EditResponse<TabDefinition>>, AppError> {
    let tab = state.profile.rename_tab(&id, &req.label).await?;
    Ok(edited(&state, tab))
}

/// DELETE /api/v1/profile/tabs/:id
pub async fn handle_delete_tab(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.profile.delete_tab(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/profile/tabs/:id/move
pub async fn handle_move_tab(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<EditResponse<Vec<TabDefinition>>>, AppError> {
    let tabs = state.profile.move_tab(&id, req.position).await?;
    Ok(edited(&state, tabs))
}

async fn ensure_custom_field(state: &AppState, id: Uuid) -> Result<(), AppError> {
    let doc = state.profile.snapshot().await;
    sections::position_of::<CustomField>(&doc, id)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("custom_fields entry {id} not found")))
}

/// POST /api/v1/profile/custom-fields/:id/file
/// The field is only updated after the upload succeeds.
pub async fn handle_custom_field_file(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<EditResponse<CustomField>>, AppError> {
    ensure_custom_field(&state, id).await?;
    let file = read_file_field(multipart).await?;
    let reference = state
        .attachments
        .upload_file(file.bytes, &file.name, file.content_type.as_deref())
        .await?;
    let field = state
        .profile
        .set_custom_value(id, CustomValue::File(reference))
        .await?;
    Ok(edited(&state, field))
}

/// PUT /api/v1/profile/custom-fields/:id/url
pub async fn handle_custom_field_url(
    _auth: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<EditResponse<CustomField>>, AppError> {
    ensure_custom_field(&state, id).await?;
    let reference = state.attachments.accept_url(&req.url)?;
    let field = state
        .profile
        .set_custom_value(id, CustomValue::Url(reference.url))
        .await?;
    Ok(edited(&state, field))
}

/// POST /api/v1/profile/photo
pub async fn handle_upload_photo(
    _auth: Authenticated,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EditResponse<Value>>, AppError> {
    let file = read_file_field(multipart).await?;
    let content_type = state.attachments.policy().check_upload(
        &file.name,
        file.content_type.as_deref(),
        file.bytes.len() as u64,
    )?;
    if !content_type.starts_with("image/") {
        return Err(AttachmentError::DisallowedType(file.name).into());
    }
    let reference = state
        .attachments
        .upload_file(file.bytes, &file.name, file.content_type.as_deref())
        .await?;
    let doc = state
        .profile
        .mutate("/basic_info/photo", to_json(&reference)?)
        .await?;
    Ok(edited(&state, to_json(&doc.basic_info)?))
}
