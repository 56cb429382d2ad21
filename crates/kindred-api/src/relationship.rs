use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::info;

use kindred_auth::Claims;
use kindred_db::models::PatchupOutcome;
use kindred_types::api::{
    BreakupRequest, BreakupStatusResponse, Credentials, MessageResponse, StatusUpdateRequest,
};
use kindred_types::models::{Account, RelationshipStatus};

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};
use crate::middleware::{optional_claims, token_from_headers};

#[derive(Debug, Deserialize)]
pub struct CredentialsQuery {
    pub email: Option<String>,
    pub pin: Option<String>,
}

/// Accounts on a break cannot log in, so these routes take a token when
/// there is one and fall back to email + PIN.
async fn resolve_caller(
    state: &AppStateInner,
    headers: &HeaderMap,
    fallback: Option<Credentials>,
) -> ApiResult<Account> {
    if let Some(claims) = optional_claims(state, headers)? {
        return state.account(&claims.sub).await;
    }
    match fallback {
        Some(creds) => state.account_with_pin(&creds.email, &creds.pin).await,
        None => Err(ApiError::unauthorized("Missing token or email")),
    }
}

fn partner_of(account: &Account, missing: &str) -> ApiResult<String> {
    account
        .partner()
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(missing))
}

/// PATCH /relationship/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StatusUpdateRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let status: RelationshipStatus = req
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid status value"))?;

    let account = state.account(&claims.sub).await?;
    let partner = partner_of(&account, "No partner linked")?;

    let email = account.email.clone();
    state
        .db_call(move |db| db.set_relationship_status(&email, &partner, status))
        .await?;

    info!("{} set relationship status to {}", account.email, status);
    Ok(Json(MessageResponse::new(format!(
        "Relationship status updated to \"{status}\""
    ))))
}

/// POST /relationship/breakup
pub async fn breakup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BreakupRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::bad_request("Reason is required"));
    }

    let account = state.account(&claims.sub).await?;
    let partner = partner_of(&account, "No partner paired")?;

    let email = account.email.clone();
    state
        .db_call(move |db| db.record_breakup(&email, &partner, &reason))
        .await?;

    info!("{} recorded a breakup", account.email);
    Ok(Json(MessageResponse::new("Breakup reason saved")))
}

/// GET /relationship/breakup
pub async fn breakup_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CredentialsQuery>,
) -> ApiResult<Json<BreakupStatusResponse>> {
    let fallback = match (query.email, query.pin) {
        (Some(email), Some(pin)) => Some(Credentials { email, pin }),
        _ => None,
    };
    let account = resolve_caller(&state, &headers, fallback).await?;

    if account.relationship_status != RelationshipStatus::Break {
        return Err(ApiError::bad_request("Not in breakup state"));
    }

    let partner_requested = match account.partner() {
        Some(partner) => {
            let partner = partner.to_string();
            state
                .db_call(move |db| db.get_account(&partner))
                .await?
                .is_some_and(|p| p.patch_requested)
        }
        None => false,
    };

    Ok(Json(BreakupStatusResponse {
        breakup_reason: account.breakup_reason,
        you_requested: account.patch_requested,
        partner_requested,
    }))
}

/// POST /relationship/patchup
pub async fn patchup(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<MessageResponse>> {
    let fallback = if body.is_empty() || token_from_headers(&headers).is_some() {
        None
    } else {
        Some(
            serde_json::from_slice::<Credentials>(&body)
                .map_err(|e| ApiError::bad_request(format!("Invalid request body: {e}")))?,
        )
    };
    let account = resolve_caller(&state, &headers, fallback).await?;

    let email = account.email.clone();
    let outcome = state
        .db_call(move |db| db.request_patchup(&email))
        .await?;

    match outcome {
        PatchupOutcome::Completed => {
            info!("{} completed a patch-up", account.email);
            Ok(Json(MessageResponse::new("Patch-up complete!")))
        }
        PatchupOutcome::Waiting => Ok(Json(MessageResponse::new(
            "Patch-up request sent. Waiting for your partner.",
        ))),
        PatchupOutcome::NotOnBreak => Err(ApiError::bad_request("Not in breakup state")),
        PatchupOutcome::NoPartner => Err(ApiError::bad_request("No partner found")),
        PatchupOutcome::PartnerMissing => Err(ApiError::not_found("Partner not found")),
        PatchupOutcome::AccountMissing => Err(ApiError::not_found("User not found")),
    }
}
