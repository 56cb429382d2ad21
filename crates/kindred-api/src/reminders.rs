use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use kindred_auth::Claims;
use kindred_db::models::ReminderChanges;
use kindred_types::api::{
    CreateReminderRequest, MessageResponse, RemindersResponse, UpdateReminderRequest,
};
use kindred_types::models::Reminder;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::paired_caller;

/// Clients may send a full ISO timestamp; only the calendar date is kept.
pub fn date_only(date: &str) -> String {
    date.split('T').next().unwrap_or_default().to_string()
}

fn reminder_not_found() -> ApiError {
    ApiError::not_found("Reminder not found")
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

pub async fn list_reminders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<RemindersResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;
    let reminders = state.db_call(move |db| db.list_reminders(&code)).await?;
    Ok(Json(RemindersResponse { reminders }))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(title), Some(description), Some(date), Some(time), Some(priority)) = (
        present(req.title),
        present(req.description),
        present(req.date),
        present(req.time),
        present(req.priority),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let (account, code) = paired_caller(&state, &claims).await?;

    let reminder = Reminder {
        id: Uuid::new_v4(),
        title,
        description,
        date: date_only(&date),
        time,
        priority,
        is_completed: false,
        is_recurring: req.is_recurring,
        recurring_type: req.recurring_type.filter(|_| req.is_recurring),
        created_by: account.name,
        email: account.email,
        created_at: Utc::now(),
    };

    let record = reminder.clone();
    state
        .db_call(move |db| db.insert_reminder(&code, &record))
        .await?;

    Ok((StatusCode::CREATED, Json(reminder)))
}

pub async fn update_reminder(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateReminderRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let changes = ReminderChanges {
        title: req.title,
        description: req.description,
        date: req.date.as_deref().map(date_only),
        time: req.time,
        priority: req.priority,
        is_recurring: req.is_recurring,
        recurring_type: req.recurring_type,
    };

    let updated = state
        .db_call(move |db| db.update_reminder(&code, &reminder_id, &changes))
        .await?;
    if !updated {
        return Err(reminder_not_found());
    }

    Ok(Json(MessageResponse::new("Reminder updated")))
}

pub async fn toggle_complete(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<serde_json::Value>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let is_completed = state
        .db_call(move |db| db.toggle_reminder_complete(&code, &reminder_id))
        .await?
        .ok_or_else(reminder_not_found)?;

    Ok(Json(serde_json::json!({ "isCompleted": is_completed })))
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessageResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let deleted = state
        .db_call(move |db| db.delete_reminder(&code, &reminder_id))
        .await?;
    if !deleted {
        return Err(reminder_not_found());
    }

    Ok(Json(MessageResponse::new("Reminder deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_cut_to_the_date() {
        assert_eq!(date_only("2026-02-14T09:30:00.000Z"), "2026-02-14");
        assert_eq!(date_only("2026-02-14"), "2026-02-14");
    }
}
