use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_INVITATION_EXPIRY_DAYS: i64 = 14;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub refresh_cookie_secure: bool,
    pub refresh_cookie_domain: Option<String>,
    pub cors_allowed_origin: Option<String>,
    pub invitation_expiry_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_pool_size: parsed_var("DATABASE_MAX_POOL_SIZE", DEFAULT_MAX_POOL_SIZE)?,
            server_host: var_or("SERVER_HOST", "127.0.0.1"),
            server_port: parsed_var("SERVER_PORT", 3000)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: var_or("JWT_ISSUER", "artistbox"),
            jwt_audience: var_or("JWT_AUDIENCE", "artistbox-clients"),
            jwt_expiry_minutes: parsed_var("JWT_EXPIRY_MINUTES", 60)?,
            refresh_token_expiry_days: parsed_var("REFRESH_TOKEN_EXPIRY_DAYS", 30)?,
            refresh_cookie_secure: env::var("REFRESH_COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            refresh_cookie_domain: env::var("REFRESH_COOKIE_DOMAIN").ok(),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
            invitation_expiry_days: parsed_var(
                "INVITATION_EXPIRY_DAYS",
                DEFAULT_INVITATION_EXPIRY_DAYS,
            )?,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Parses `name` when it is set. An unparseable value is an error, not the default.
fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("*****"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
