use axum::{Extension, Json, extract::State};
use tracing::info;

use kindred_auth::Claims;
use kindred_auth::pin::{hash_pin, verify_pin};
use kindred_types::api::{ChangePinRequest, MessageResponse, UpdateProfileRequest, UserResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<UserResponse>> {
    let account = state.account(&claims.sub).await?;

    let partner_name = match account.partner() {
        Some(partner) => {
            let partner = partner.to_string();
            state
                .db_call(move |db| db.get_account(&partner))
                .await?
                .map(|p| p.name)
        }
        None => None,
    };

    Ok(Json(UserResponse {
        email: account.email,
        name: account.name,
        is_paired: account.is_paired,
        partner_code: account.pair_code,
        paired_with: account.paired_with,
        partner_name,
        relationship_status: account.relationship_status,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let name = req.name.unwrap_or_default().trim().to_string();
    if name.chars().count() < 2 {
        return Err(ApiError::bad_request("Name must be at least 2 characters"));
    }

    let email = claims.sub.clone();
    let changed = state
        .db_call(move |db| db.update_name(&email, &name))
        .await?;

    Ok(Json(MessageResponse::new(if changed {
        "Profile updated successfully"
    } else {
        "No changes made"
    })))
}

pub async fn change_pin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ChangePinRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(old_pin), Some(new_pin)) = (
        req.old_pin.filter(|p| !p.is_empty()),
        req.new_pin.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Both old and new PIN are required"));
    };

    let account = state.account(&claims.sub).await?;
    if !verify_pin(&old_pin, &account.pin_hash)? {
        return Err(ApiError::forbidden("Old PIN is incorrect"));
    }

    let pin_hash = hash_pin(&new_pin)?;
    let email = account.email.clone();
    state
        .db_call(move |db| db.update_pin_hash(&email, &pin_hash))
        .await?;

    info!("{} changed their PIN", account.email);
    Ok(Json(MessageResponse::new("PIN changed successfully")))
}
