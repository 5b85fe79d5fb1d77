use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    /// token lifetime in seconds
    pub token_ttl: usize,
    pub api_prefix: String,
    pub log_dir: String,

    // Google sign-in, enabled when all three are set
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_url: Option<String>,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_signup_per_min: u32,
    pub rate_password_per_min: u32,
    pub rate_protected_per_min: u32,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            server_addr: or_default("SERVER_ADDR", "0.0.0.0:5000".to_string())?,
            token_ttl: or_default("TOKEN_TTL", 86_400)?, // default 24h
            api_prefix: or_default("API_PREFIX", "/api".to_string())?,
            log_dir: or_default("LOG_DIR", "logs".to_string())?,

            google_client_id: optional("GOOGLE_CLIENT_ID"),
            google_client_secret: optional("GOOGLE_CLIENT_SECRET"),
            google_redirect_url: optional("GOOGLE_REDIRECT_URL"),

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_signup_per_min: or_default("RATE_SIGNUP_PER_MIN", 30)?,
            rate_password_per_min: or_default("RATE_PASSWORD_PER_MIN", 10)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn test_config() -> Config {
        Config {
            database_url: "mysql://unused".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            token_ttl: 3600,
            api_prefix: "/api".into(),
            log_dir: "logs".into(),
            google_client_id: None,
            google_client_secret: None,
            google_redirect_url: None,
            rate_login_per_min: 10_000,
            rate_signup_per_min: 10_000,
            rate_password_per_min: 10_000,
            rate_protected_per_min: 10_000,
        }
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(or_default("LEAVEDESK_TEST_UNSET_KEY", 42u32).unwrap(), 42);
    }

    #[test]
    fn missing_required_key_names_it() {
        let err = required("LEAVEDESK_TEST_MISSING_KEY").unwrap_err();
        assert!(err.to_string().contains("LEAVEDESK_TEST_MISSING_KEY"));
    }
}
