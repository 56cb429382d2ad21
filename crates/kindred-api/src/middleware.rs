use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use kindred_auth::{Claims, Rejection, TOKEN_COOKIE, TokenVerifier, extract_token};
use kindred_types::models::Account;

use crate::auth::{AppState, AppStateInner};
use crate::error::{ApiError, ApiResult};

/// All `Cookie` headers of a request as one `; `-separated string.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let joined = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    (!joined.is_empty()).then_some(joined)
}

/// Bearer header first, then the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookies = cookie_header(headers)?;
    extract_token(&cookies, TOKEN_COOKIE).map(str::to_string)
}

fn rejected(rejection: Rejection) -> ApiError {
    match rejection {
        Rejection::Expired => ApiError::unauthorized("Token expired"),
        Rejection::Malformed | Rejection::BadSignature => ApiError::unauthorized("Invalid token"),
    }
}

/// Verified claims if the request carries a token, `None` if it carries none.
/// A token that is present but invalid is still an error.
pub fn optional_claims(state: &AppStateInner, headers: &HeaderMap) -> ApiResult<Option<Claims>> {
    match token_from_headers(headers) {
        Some(token) => state.keys.verify(&token).map(Some).map_err(rejected),
        None => Ok(None),
    }
}

/// Extract and validate the session token, then hand the claims to the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = optional_claims(&state, req.headers())?
        .ok_or_else(|| ApiError::unauthorized("Missing token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// The caller's account and pairing code. Pair-scoped resources are
/// unreachable without one.
pub async fn paired_caller(state: &AppStateInner, claims: &Claims) -> ApiResult<(Account, String)> {
    let account = state.account(&claims.sub).await?;
    match account.pair_code.clone() {
        Some(code) if account.is_paired => Ok((account, code)),
        _ => Err(ApiError::forbidden("User not paired")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("kindred=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn no_credential_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(token_from_headers(&headers), None);
    }

    #[test]
    fn cookie_headers_are_joined() {
        let mut headers = HeaderMap::new();
        assert_eq!(cookie_header(&headers), None);

        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("kindred=abc"));
        assert_eq!(
            cookie_header(&headers).as_deref(),
            Some("theme=dark; kindred=abc")
        );
    }

    #[test]
    fn session_cookie_found_in_a_later_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("kindred=second"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("second"));
    }
}
