use axum::{Json, extract::State};
use rand::Rng;
use tracing::info;

use kindred_db::models::{CodeOutcome, PairOutcome};
use kindred_types::api::{PairRequest, PairResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// Give up on finding a free code after this many collisions.
const CODE_ATTEMPTS: usize = 32;

/// Three uppercase letters followed by three digits, e.g. `QZK042`.
pub fn generate_pair_code<R: Rng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(6);
    for _ in 0..3 {
        code.push(char::from(rng.random_range(b'A'..=b'Z')));
    }
    for _ in 0..3 {
        code.push(char::from(rng.random_range(b'0'..=b'9')));
    }
    code
}

pub fn is_pair_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 6
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3..].iter().all(u8::is_ascii_digit)
}

/// POST /pair: works before first login, so the PIN stands in for a token.
pub async fn pair(
    State(state): State<AppState>,
    Json(req): Json<PairRequest>,
) -> ApiResult<Json<PairResponse>> {
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing email"))?;
    let pin = req
        .pin
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing PIN"))?;

    let account = state.account_with_pin(&email, &pin).await?;
    if account.is_paired {
        return Ok(Json(PairResponse {
            message: "Already paired".into(),
            partner_code: None,
        }));
    }

    let partner_code = req
        .partner_code
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    match partner_code {
        Some(code) => {
            let joiner = email.clone();
            let joined = code.clone();
            let outcome = state
                .db_call(move |db| db.pair_with_code(&joiner, &joined))
                .await?;

            match outcome {
                PairOutcome::Paired { partner_email } => {
                    info!("{} paired with {} via {}", email, partner_email, code);
                    Ok(Json(PairResponse {
                        message: "Paired successfully".into(),
                        partner_code: None,
                    }))
                }
                PairOutcome::AlreadyPaired => Ok(Json(PairResponse {
                    message: "Already paired".into(),
                    partner_code: None,
                })),
                PairOutcome::InvalidCode => Err(ApiError::bad_request(
                    "Invalid or already-used partner code",
                )),
                PairOutcome::AccountMissing => Err(ApiError::not_found("User not found")),
            }
        }
        None => {
            let holder = email.clone();
            let outcome = state
                .db_call(move |db| {
                    for _ in 0..CODE_ATTEMPTS {
                        let code = generate_pair_code(&mut rand::rng());
                        match db.set_pair_code(&holder, &code)? {
                            CodeOutcome::InUse => continue,
                            outcome => return Ok((outcome, code)),
                        }
                    }
                    anyhow::bail!("no free pairing code after {} attempts", CODE_ATTEMPTS)
                })
                .await?;

            match outcome {
                (CodeOutcome::Assigned, code) => {
                    info!("{} generated pairing code {}", email, code);
                    Ok(Json(PairResponse {
                        message: "Code generated".into(),
                        partner_code: Some(code),
                    }))
                }
                (CodeOutcome::AlreadyPaired, _) => Ok(Json(PairResponse {
                    message: "Already paired".into(),
                    partner_code: None,
                })),
                (CodeOutcome::AccountMissing | CodeOutcome::InUse, _) => {
                    Err(ApiError::not_found("User not found"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_the_expected_shape() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let code = generate_pair_code(&mut rng);
            assert!(is_pair_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn shape_check_rejects_near_misses() {
        assert!(is_pair_code("ABC123"));
        assert!(!is_pair_code("abc123"));
        assert!(!is_pair_code("AB1234"));
        assert!(!is_pair_code("ABC12"));
        assert!(!is_pair_code("ABC1234"));
    }
}
