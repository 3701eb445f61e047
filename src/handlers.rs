use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::{ApiJson, ApiPath},
    models::{CreateNoteRequest, ErrorResponse, MessageResponse, NewNote, UpdateNoteRequest},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

pub const NOTE_CREATED: &str = "Note created successfully";
pub const NOTE_UPDATED: &str = "Note updated successfully";
pub const NOTE_DELETED: &str = "Note deleted successfully";

// --- Handlers ---

/// store_note
///
/// [Authenticated Route] Creates a note in a section. The section is resolved by id or
/// tag inside the same transaction as the insert; the owner is the calling user.
#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Created", body = MessageResponse),
        (status = 400, description = "Invalid body or no section reference", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 503, description = "Retries exhausted", body = ErrorResponse)
    )
)]
pub async fn store_note(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let section = payload.section().ok_or_else(|| {
        ApiError::BadRequest("Either section_id or section_tag is required".to_string())
    })?;

    let note = state
        .repo
        .create_note(NewNote {
            description: payload.description,
            section,
            section_ref_slug: payload.section_ref,
            user_id,
        })
        .await?;

    tracing::info!(note_id = note.id, section_id = note.section_id, %user_id, "note created");
    Ok((StatusCode::CREATED, Json(MessageResponse::new(NOTE_CREATED))))
}

/// update_note
///
/// [Authenticated Route] Replaces a note's description. Nothing else about the note changes.
///
/// *Authorization*: owner or admin, checked under the note's row lock.
#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 400, description = "Invalid id or body", body = ErrorResponse),
        (status = 403, description = "Not owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn update_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateNoteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let note = state
        .repo
        .update_note_description(id, (&auth_user).into(), payload.description)
        .await?;

    tracing::info!(note_id = note.id, user_id = %auth_user.id, "note updated");
    Ok(Json(MessageResponse::new(NOTE_UPDATED)))
}

/// destroy_note
///
/// [Authenticated Route] Deletes a note together with all of its comments and media,
/// atomically.
#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = i64, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 403, description = "Not owner", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub async fn destroy_note(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let deleted = state.repo.delete_note(id, (&auth_user).into()).await?;

    tracing::info!(
        note_id = deleted.note_id,
        comments = deleted.comments,
        media = deleted.media,
        user_id = %auth_user.id,
        "note deleted"
    );
    Ok(Json(MessageResponse::new(NOTE_DELETED)))
}
