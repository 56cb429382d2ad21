//! Kindred credentials.
//!
//! Signed session tokens (HS256) carried as a cookie or bearer header,
//! and Argon2id hashing for account PINs.

pub mod cookie;
pub mod pin;
pub mod token;

pub use cookie::{TOKEN_COOKIE, extract_token};
pub use token::{Claims, JwtKeys, Rejection, TokenVerifier};
