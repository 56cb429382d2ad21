use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, info};

use kindred_auth::pin::{hash_pin, verify_pin};
use kindred_auth::{JwtKeys, TOKEN_COOKIE};
use kindred_db::Database;
use kindred_gateway::ChatHub;
use kindred_types::api::{LoginRequest, LoginResponse, MessageResponse, SignupRequest};
use kindred_types::models::{Account, LoginBlock};

use crate::error::{ApiError, ApiResult};
use crate::storage::BlobStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub keys: Arc<JwtKeys>,
    pub hub: ChatHub,
    pub blobs: BlobStore,
}

impl AppStateInner {
    /// Run a blocking store call off the async runtime.
    pub async fn db_call<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db)).await?;
        Ok(result?)
    }

    pub async fn account(&self, email: &str) -> ApiResult<Account> {
        let email = email.to_string();
        self.db_call(move |db| db.get_account(&email))
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Look up an account by email and check its PIN.
    pub async fn account_with_pin(&self, email: &str, pin: &str) -> ApiResult<Account> {
        let account = self.account(email).await?;
        if !verify_pin(pin, &account.pin_hash)? {
            return Err(ApiError::unauthorized("Invalid PIN"));
        }
        Ok(account)
    }
}

fn required(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(name), Some(email), Some(pin)) =
        (required(req.name), required(req.email), required(req.pin))
    else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let pin_hash = hash_pin(&pin)?;

    let account_email = email.clone();
    let created = state
        .db_call(move |db| db.create_account(&account_email, &name, &pin_hash))
        .await?;
    if !created {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    info!("Account created for {}", email);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Signup successful")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let (Some(email), Some(pin)) = (required(req.email), required(req.pin)) else {
        return Err(ApiError::bad_request("Missing email or PIN"));
    };

    let account = state.account_with_pin(&email, &pin).await?;

    match account.login_block() {
        Some(LoginBlock::NotPaired) => {
            return Err(ApiError::forbidden(
                "You must pair with your partner before using chat.",
            ));
        }
        Some(LoginBlock::OnBreak { reason }) => {
            let reason = reason.unwrap_or_else(|| "No reason provided.".to_string());
            return Err(ApiError::forbidden(format!(
                "Your partner has taken a break: {reason}"
            )));
        }
        None => {}
    }

    let token = state
        .keys
        .issue(&account.email, &account.name)
        .map_err(|e| {
            error!("Failed to sign token for {}: {}", account.email, e);
            ApiError::Internal(e.to_string())
        })?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/");

    info!("{} logged in", account.email);
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Login successful".into(),
            token,
            email: account.email,
            name: account.name,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        Json(MessageResponse::new("Logged out successfully")),
    )
}
