use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use kindred_auth::Claims;
use kindred_types::api::{
    CreateNoteRequest, FavoriteResponse, MessageResponse, NotesResponse, UpdateNoteRequest,
};
use kindred_types::models::Note;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::paired_caller;

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_COLOR: &str = "bg-pink-100";

fn note_not_found() -> ApiError {
    ApiError::not_found("Note not found")
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<NotesResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;
    let notes = state.db_call(move |db| db.list_notes(&code)).await?;
    Ok(Json(NotesResponse { notes }))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<impl IntoResponse> {
    let (account, code) = paired_caller(&state, &claims).await?;

    let now = Utc::now();
    let note = Note {
        id: Uuid::new_v4(),
        title: req
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        content: req.content.unwrap_or_default(),
        color: req
            .color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        is_favorite: req.is_favorite,
        created_by: account.name,
        created_at: now,
        updated_at: now,
    };

    let record = note.clone();
    state
        .db_call(move |db| db.insert_note(&code, &record))
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateNoteRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let updated = state
        .db_call(move |db| {
            db.update_note(
                &code,
                &note_id,
                req.title.as_deref(),
                req.content.as_deref(),
                req.color.as_deref(),
                Utc::now(),
            )
        })
        .await?;
    if !updated {
        return Err(note_not_found());
    }

    Ok(Json(MessageResponse::new("Note updated")))
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<FavoriteResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let is_favorite = state
        .db_call(move |db| db.toggle_note_favorite(&code, &note_id, Utc::now()))
        .await?
        .ok_or_else(note_not_found)?;

    Ok(Json(FavoriteResponse { is_favorite }))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let deleted = state
        .db_call(move |db| db.delete_note(&code, &note_id))
        .await?;
    if !deleted {
        return Err(note_not_found());
    }

    Ok(Json(MessageResponse::new("Note deleted")))
}
