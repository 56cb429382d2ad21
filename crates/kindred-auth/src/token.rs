use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Session token claims. `sub` is the account email, which is the identity
/// bound to every authenticated request and chat connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("bad token signature")]
    BadSignature,
}

/// Verifies an opaque credential string and yields the identity it carries.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, Rejection>;
}

/// HS256 signing and verification with a shared secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    pub fn issue(&self, email: &str, name: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_expiring(email, name, Utc::now() + self.ttl)
    }

    pub fn issue_expiring(
        &self,
        email: &str,
        name: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: email.to_string(),
            name: name.to_string(),
            exp: expires_at.timestamp().max(0) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }
}

impl TokenVerifier for JwtKeys {
    fn verify(&self, token: &str) -> Result<Claims, Rejection> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => Rejection::Expired,
                ErrorKind::InvalidSignature => Rejection::BadSignature,
                _ => Rejection::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(secret, Duration::hours(24))
    }

    #[test]
    fn issued_token_verifies() {
        let keys = keys("s3cret");
        let token = keys.issue("a@example.com", "Ana").unwrap();

        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "a@example.com");
        assert_eq!(claims.name, "Ana");
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = keys("s3cret");
        let token = keys
            .issue_expiring("a@example.com", "Ana", Utc::now() - Duration::hours(2))
            .unwrap();

        assert_eq!(keys.verify(&token).unwrap_err(), Rejection::Expired);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = keys("other").issue("a@example.com", "Ana").unwrap();
        assert_eq!(keys("s3cret").verify(&token).unwrap_err(), Rejection::BadSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(keys("s3cret").verify("not-a-token").unwrap_err(), Rejection::Malformed);
        assert_eq!(keys("s3cret").verify("").unwrap_err(), Rejection::Malformed);
    }
}
