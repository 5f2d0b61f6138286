use crate::error::{Error, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub password: String,
    pub base_url: String,
    pub export_dir: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let email = env::var("INDECAB_EMAIL")
            .map_err(|_| Error::Config("INDECAB_EMAIL environment variable not set".to_string()))?;

        let password = env::var("INDECAB_PASSWORD").map_err(|_| {
            Error::Config("INDECAB_PASSWORD environment variable not set".to_string())
        })?;

        let base_url = env::var("INDECAB_BASE_URL")
            .unwrap_or_else(|_| "https://app.indecab.com/api/beta".to_string());

        let export_dir = env::var("EXPORT_DIR").unwrap_or_else(|_| ".".to_string());

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            email,
            password,
            base_url: base_url.trim_end_matches('/').to_string(),
            export_dir,
            request_timeout_secs,
        })
    }
}
