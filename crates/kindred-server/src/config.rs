//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `KINDRED_HOST`. Default: `0.0.0.0`
    pub host: String,

    /// Env: `KINDRED_PORT`. Default: `3000`
    pub port: u16,

    /// SQLite database file.
    /// Env: `KINDRED_DB_PATH`. Default: `kindred.db`
    pub db_path: PathBuf,

    /// HS256 secret for session tokens.
    /// Env: `KINDRED_JWT_SECRET`. Default: a development secret (warned about at startup).
    pub jwt_secret: String,

    /// Env: `KINDRED_TOKEN_TTL_HOURS`. Default: `24`
    pub token_ttl_hours: i64,

    /// Where gallery uploads are written; served at `/uploads`.
    /// Env: `KINDRED_UPLOAD_DIR`. Default: `./uploads`
    pub upload_dir: PathBuf,

    /// Base URL used to build public upload links.
    /// Env: `KINDRED_PUBLIC_URL`. Default: `http://localhost:3000`
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            db_path: PathBuf::from("kindred.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            upload_dir: PathBuf::from("./uploads"),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("KINDRED_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("KINDRED_PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => tracing::warn!(value = %port, "Invalid KINDRED_PORT, using default"),
            }
        }

        if let Some(path) = lookup("KINDRED_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        match lookup("KINDRED_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => tracing::warn!("KINDRED_JWT_SECRET not set, using the development secret"),
        }

        if let Some(hours) = lookup("KINDRED_TOKEN_TTL_HOURS") {
            match hours.parse::<i64>() {
                Ok(hours) if hours > 0 => config.token_ttl_hours = hours,
                _ => tracing::warn!(value = %hours, "Invalid KINDRED_TOKEN_TTL_HOURS, using default"),
            }
        }

        if let Some(dir) = lookup("KINDRED_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("KINDRED_PUBLIC_URL") {
            config.public_url = url;
        }

        config
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.addr().unwrap(), ([0, 0, 0, 0], 3000).into());
    }

    #[test]
    fn env_values_override_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("KINDRED_HOST", "127.0.0.1"),
            ("KINDRED_PORT", "8081"),
            ("KINDRED_JWT_SECRET", "s3cret"),
            ("KINDRED_UPLOAD_DIR", "/tmp/kindred"),
        ]));
        assert_eq!(config.addr().unwrap(), ([127, 0, 0, 1], 8081).into());
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/kindred"));
    }

    #[test]
    fn bad_numbers_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("KINDRED_PORT", "not-a-port"),
            ("KINDRED_TOKEN_TTL_HOURS", "-3"),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_hours, 24);
    }
}
