use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// How long a token stays valid after a successful login.
const TOKEN_TTL_HOURS: i64 = 48;

/// A bearer credential returned by the login endpoint.
///
/// Sent on every request as `X-User-Id` / `X-Auth-Token` headers.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user_id: String,
    pub auth_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Deserialize)]
struct LoginData {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "authToken")]
    auth_token: Option<String>,
}

/// Single source of truth for the process credential.
///
/// Shared by cloning; all clones observe the same stored credential, so a
/// refresh performed while paging is visible to every caller.
#[derive(Clone)]
pub struct TokenManager {
    client: Client,
    login_url: String,
    email: String,
    password: String,
    credential: Arc<Mutex<Option<Credential>>>,
}

impl TokenManager {
    pub fn new(client: Client, base_url: &str, email: &str, password: &str) -> Self {
        Self {
            client,
            login_url: format!("{}/login", base_url),
            email: email.to_string(),
            password: password.to_string(),
            credential: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns a non-expired credential, logging in transparently if none
    /// is stored or the stored one has expired.
    pub async fn get_valid(&self) -> Result<Credential> {
        let mut slot = self.credential.lock().await;

        if let Some(credential) = slot.as_ref() {
            if !credential.is_expired(Utc::now()) {
                return Ok(credential.clone());
            }
            tracing::info!("Stored token expired, logging in again");
        }

        let fresh = self.login().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drops the stored credential so the next `get_valid` performs a login.
    /// Called when the API answers 401 despite an unexpired token.
    pub async fn invalidate(&self) {
        let mut slot = self.credential.lock().await;
        *slot = None;
    }

    /// Forces a fresh login and stores the result.
    pub async fn refresh(&self) -> Result<Credential> {
        self.invalidate().await;
        self.get_valid().await
    }

    async fn login(&self) -> Result<Credential> {
        tracing::info!("Logging in to {}", self.login_url);

        let response = self
            .client
            .post(&self.login_url)
            .json(&serde_json::json!({
                "email": self.email,
                "password": self.password,
            }))
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("Login failed ({}): {}", status, body)));
        }

        let payload: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Login returned invalid JSON: {}", e)))?;

        let data = payload
            .data
            .ok_or_else(|| Error::Auth("Login response missing data payload".to_string()))?;

        match (data.user_id, data.auth_token) {
            (Some(user_id), Some(auth_token)) => Ok(Credential {
                user_id,
                auth_token,
                expires_at: Utc::now() + Duration::hours(TOKEN_TTL_HOURS),
            }),
            _ => Err(Error::Auth(
                "Login response missing userId or authToken".to_string(),
            )),
        }
    }
}
