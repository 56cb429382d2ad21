use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::warn;

use kindred_auth::Claims;
use kindred_gateway::ChatError;
use kindred_types::api::{MessagesResponse, SentMessageResponse};
use kindred_types::events::InboundFrame;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::paired_caller;

/// GET /messages: the caller's conversation in persisted order.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessagesResponse>> {
    let (_, code) = paired_caller(&state, &claims).await?;

    let messages = state
        .db_call(move |db| db.find_conversation(&code))
        .await?
        .map(|c| c.messages)
        .unwrap_or_default();

    Ok(Json(MessagesResponse { messages }))
}

/// POST /messages: same publish path as the chat socket, so live members
/// see REST-sent messages too.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(frame): Json<InboundFrame>,
) -> ApiResult<impl IntoResponse> {
    let (account, code) = paired_caller(&state, &claims).await?;

    let message = state
        .hub
        .publish(&code, &account.email, frame)
        .await
        .map_err(|e| {
            warn!("{} on chat {}: {}", account.email, code, e);
            match e {
                ChatError::Persist(inner) => ApiError::from(inner),
                ChatError::Task(join) => ApiError::from(join),
            }
        })?;

    Ok((StatusCode::CREATED, Json(SentMessageResponse { message })))
}
