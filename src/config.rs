use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

/// Immutable process configuration. Built once in `main` and passed to every
/// component that needs it; there is no global configuration state.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub webapp_url: String,
    pub uploads_identity_dir: String,
    pub uploads_project_dir: String,
    pub max_identity_file_bytes: usize,
    pub max_project_file_bytes: usize,
    pub step2_token_bytes: usize,
    pub public_rps: u32,
    pub jury_rps: u32,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from: String,
    pub mail_reply_to: String,
    pub jury_email: String,
    pub mail_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            webapp_url: get_env("WEBAPP_URL")?,
            uploads_identity_dir: env::var("UPLOADS_IDENTITY_DIR")
                .unwrap_or_else(|_| "./uploads/pieces-identite".to_string()),
            uploads_project_dir: env::var("UPLOADS_PROJECT_DIR")
                .unwrap_or_else(|_| "./uploads/dossiers".to_string()),
            max_identity_file_bytes: get_env_parse("MAX_IDENTITY_FILE_BYTES")?,
            max_project_file_bytes: get_env_parse("MAX_PROJECT_FILE_BYTES")?,
            step2_token_bytes: get_env_parse("STEP2_TOKEN_BYTES")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            jury_rps: get_env_parse("JURY_RPS")?,
            mail_api_url: get_env("MAIL_API_URL")?,
            mail_api_key: get_env("MAIL_API_KEY")?,
            mail_from: get_env("MAIL_FROM")?,
            mail_reply_to: get_env("MAIL_REPLY_TO")?,
            jury_email: get_env("JURY_EMAIL")?,
            mail_timeout_secs: get_env_parse("MAIL_TIMEOUT_SECS")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}
